use std::{sync::Arc, time::Duration};

use indexmap::map::Entry;
use live_feed::{Clock, FeedRequest, FeedSource, FetchError, FetchResult, WindowedFetchCache};
use model::carpark::{CarparkAvailability, CarparkLots, LotAvailability, LotType};
use utility::id::EntityId;

use crate::{
    client::LtaCredentials,
    data_model::{carpark_availability::CarparkAvailabilityRow, Response},
    CARPARK_AVAILABILITY_URL,
};

/// Rows per page of `CarParkAvailabilityv2`.
pub const PAGE_SIZE: usize = 500;
const MAX_PAGES: usize = 20;

/// Live carpark availability, fetched at most once per page and window.
pub struct CarparkAvailabilityFeed {
    cache: WindowedFetchCache<Response<CarparkAvailabilityRow>>,
    credentials: LtaCredentials,
}

impl CarparkAvailabilityFeed {
    pub const WINDOW: Duration = Duration::from_secs(120);

    pub fn new(credentials: LtaCredentials, source: Arc<dyn FeedSource>, window: Duration) -> Self {
        Self {
            cache: WindowedFetchCache::new("carpark availability", window, source),
            credentials,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.cache = self.cache.with_clock(clock);
        self
    }

    pub fn cache(&self) -> &WindowedFetchCache<Response<CarparkAvailabilityRow>> {
        &self.cache
    }

    fn page_request(&self, page: usize) -> FeedRequest {
        let request = self.credentials.request(CARPARK_AVAILABILITY_URL);
        match page {
            0 => request,
            page => request.query("$skip", (page * PAGE_SIZE).to_string()),
        }
    }

    /// Like [`Self::try_availability`], but failures are logged and reported
    /// as `None`.
    pub async fn availability(&self) -> Option<CarparkAvailability> {
        match self.try_availability().await {
            Ok(availability) => Some(availability),
            Err(why) => {
                log::warn!("Carpark availability is unavailable: {}", why);
                None
            }
        }
    }

    /// Reads every page of the feed and groups the rows by carpark.
    ///
    /// The first page must succeed. If a later page fails, the pages read so
    /// far are used. An empty feed is reported as an error.
    pub async fn try_availability(&self) -> FetchResult<CarparkAvailability> {
        let mut pages = vec![self.cache.try_fetch(&self.page_request(0)).await?];
        while pages.len() < MAX_PAGES {
            if pages.last().map_or(0, |page| page.payload.received) < PAGE_SIZE {
                break;
            }
            match self.cache.try_fetch(&self.page_request(pages.len())).await {
                Ok(page) => pages.push(page),
                Err(why) => {
                    log::warn!(
                        "Carpark availability page {} failed, using {} pages: {}",
                        pages.len(),
                        pages.len(),
                        why
                    );
                    break;
                }
            }
        }

        let availability = group_by_carpark(pages.iter().flat_map(|page| &page.payload.value));
        if availability.is_empty() {
            return Err(FetchError::Other(
                "carpark availability feed is empty".to_owned(),
            ));
        }
        Ok(availability)
    }
}

/// Groups feed rows by normalised carpark number. Lots keep feed order; if a
/// lot type appears twice for the same carpark, the first row counts.
pub fn group_by_carpark<'a, I>(rows: I) -> CarparkAvailability
where
    I: IntoIterator<Item = &'a CarparkAvailabilityRow>,
{
    let mut availability = CarparkAvailability::default();
    for row in rows {
        let id = EntityId::new(&row.carpark_id);
        if id.is_empty() {
            continue;
        }
        let lots = match availability.carparks.entry(id) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(CarparkLots {
                development: non_blank(&row.development),
                area: non_blank(&row.area),
                agency: non_blank(&row.agency),
                lots: vec![],
            }),
        };
        let lot_type = LotType::from_code(&row.lot_type);
        if lots.lots.iter().any(|lot| lot.lot_type == lot_type) {
            continue;
        }
        lots.lots.push(LotAvailability {
            lot_type,
            lots_available: row.available_lots,
        });
    }
    availability
}

fn non_blank(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_owned())
}
