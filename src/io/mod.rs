/// CSV export of tick history.
pub mod export;
