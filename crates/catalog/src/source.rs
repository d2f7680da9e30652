use std::{
    collections::HashSet,
    fs::File,
    io::Read,
    path::{Path, PathBuf},
};

use model::{carpark::CatalogEntity, geo::Svy21};
use utility::id::EntityId;

use crate::{data_model::CarparkRow, CatalogError, CatalogResult};

/// Something the static carpark catalog can be loaded from.
pub trait CatalogSource: Send + Sync {
    fn load(&self) -> CatalogResult<Vec<CatalogEntity>>;
}

/// Reads the catalog from an `HDBCarparkInformation.csv` export.
#[derive(Debug, Clone)]
pub struct CsvCatalogSource {
    path: PathBuf,
}

impl CsvCatalogSource {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CatalogSource for CsvCatalogSource {
    fn load(&self) -> CatalogResult<Vec<CatalogEntity>> {
        let file = File::open(&self.path).map_err(|why| CatalogError::Io {
            path: self.path.display().to_string(),
            reason: why.to_string(),
        })?;
        let entities = read_catalog(file)?;
        log::info!(
            "Read {} carparks from '{}'.",
            entities.len(),
            self.path.display()
        );
        Ok(entities)
    }
}

/// Parses catalog rows in file order. Any malformed row fails the whole read.
/// When a carpark number appears more than once, the first row is kept.
pub fn read_catalog<R: Read>(reader: R) -> CatalogResult<Vec<CatalogEntity>> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut seen = HashSet::new();
    let mut entities = vec![];

    for (index, row) in csv_reader.deserialize().enumerate() {
        // header is line 1
        let line = index as u64 + 2;
        let row: CarparkRow = row?;

        let id = EntityId::new(&row.id);
        if id.is_empty() {
            return Err(CatalogError::BlankId { line });
        }
        if !row.x.is_finite() || !row.y.is_finite() {
            return Err(CatalogError::InvalidPosition { line });
        }
        if !seen.insert(id.clone()) {
            log::warn!("Ignoring duplicate carpark '{}' on line {}.", id, line);
            continue;
        }

        entities.push(CatalogEntity {
            id,
            position: Svy21::new(row.x, row.y),
            address: row.address.trim().to_owned(),
        });
    }

    Ok(entities)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    const HEADER: &str = "car_park_no,address,x_coord,y_coord,car_park_type,type_of_parking_system\n";

    #[test]
    fn reads_rows_and_ignores_extra_columns() {
        let data = format!(
            "{HEADER}\
             acb,BLK 270/271 ALBERT CENTRE BASEMENT CAR PARK,30314.7936,31490.4942,BASEMENT CAR PARK,ELECTRONIC PARKING\n\
             ACM,BLK 98A ALJUNIED CRESCENT,33758.4143,33695.5198,MULTI-STOREY CAR PARK,ELECTRONIC PARKING\n"
        );
        let entities = read_catalog(data.as_bytes()).unwrap();

        assert_eq!(entities.len(), 2);
        assert_eq!(entities[0].id.as_str(), "ACB");
        assert_eq!(entities[0].position, Svy21::new(30314.7936, 31490.4942));
        assert_eq!(entities[1].address, "BLK 98A ALJUNIED CRESCENT");
    }

    #[test]
    fn first_duplicate_wins() {
        let data = format!(
            "{HEADER}\
             ACB,FIRST,1.0,2.0,,\n\
             acb ,SECOND,3.0,4.0,,\n"
        );
        let entities = read_catalog(data.as_bytes()).unwrap();
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].address, "FIRST");
    }

    #[test]
    fn blank_ids_fail_the_read() {
        let data = format!("{HEADER}ACB,FIRST,1.0,2.0,,\n  ,SECOND,3.0,4.0,,\n");
        assert!(matches!(
            read_catalog(data.as_bytes()),
            Err(CatalogError::BlankId { line: 3 })
        ));
    }

    #[test]
    fn malformed_rows_fail_the_read() {
        let data = format!("{HEADER}ACB,FIRST,not-a-number,2.0,,\n");
        assert!(matches!(
            read_catalog(data.as_bytes()),
            Err(CatalogError::Csv(_))
        ));
    }

    #[test]
    fn loads_from_a_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{HEADER}BM29,BLK 249 BISHAN STREET 22,29935.0,37617.0,,\n").unwrap();

        let entities = CsvCatalogSource::new(file.path()).load().unwrap();
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].id, EntityId::new("bm29"));
    }

    #[test]
    fn missing_files_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let source = CsvCatalogSource::new(dir.path().join("missing.csv"));
        assert!(matches!(source.load(), Err(CatalogError::Io { .. })));
    }
}
