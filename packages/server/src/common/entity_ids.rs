//! Typed ID definitions for domain entities.

pub use super::id::Id;

// ============================================================================
// Entity marker types
// ============================================================================

/// Marker type for auth users (providers and patients share the auth table).
pub struct User;

/// Marker type for patients.
pub struct Patient;

/// Marker type for appointments.
pub struct Appointment;

/// Marker type for in-progress signup wizard sessions.
pub struct RegistrationSession;

/// Marker type for document previews.
pub struct Preview;

// ============================================================================
// Type aliases - the primary API
// ============================================================================

pub type UserId = Id<User>;

pub type PatientId = Id<Patient>;

pub type AppointmentId = Id<Appointment>;

pub type SessionId = Id<RegistrationSession>;

pub type PreviewId = Id<Preview>;
