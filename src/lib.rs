//! Filter-and-aggregate pipeline behind a housing-sales dashboard.
//!
//! ```text
//!  loader ──► RecordStore ──► filter::apply(selection) ──► FilteredView
//!                                                              │
//!                                   aggregate::evaluate ◄──────┘
//!                                           │
//!                                           ▼
//!                                  Vec<CatalogEntry> (plain tables)
//! ```
//!
//! [`state::Dashboard`] ties the pieces into one interactive session.

pub mod aggregate;
pub mod config;
pub mod data;
pub mod output;
pub mod state;
