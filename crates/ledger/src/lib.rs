use service::calendar::Calendar;
use storage::{calendar::CalendarStore, catalog::CatalogStore, session::Db, Storage};

pub mod service;

pub type ClubCalendar = Calendar<CalendarStore, CatalogStore>;

#[derive(Clone)]
pub struct Ledger {
    pub db: Db,
    pub calendar: ClubCalendar,
}

impl Ledger {
    pub fn new(storage: Storage) -> Self {
        let calendar = Calendar::new(storage.calendar, storage.catalog);
        Ledger {
            db: storage.db,
            calendar,
        }
    }
}
