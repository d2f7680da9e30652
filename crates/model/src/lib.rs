pub mod bus_arrival;
pub mod carpark;
pub mod feed;
pub mod geo;
pub mod nearby;

pub trait ExampleData {
    fn example_data() -> Self;
}
