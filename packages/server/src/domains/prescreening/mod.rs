pub mod activities;
pub mod badge;
pub mod models;

pub use activities::{
    fetch_status, BadgeController, BadgeError, PrescreeningActions,
    StoreBackedPrescreeningActions,
};
pub use badge::{BadgeTone, PrescreeningAction, PrescreeningBadge};
pub use models::{Prescreening, PrescreeningStatus};
