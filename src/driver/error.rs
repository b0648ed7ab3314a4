//! Error types for the EDMA3 resource manager
//!
//! Errors are organized by domain for better diagnostics:
//! - [`StateError`]: Lifecycle violations (controller or instance state)
//! - [`ResourceError`]: Bitmap allocation and ownership failures
//! - [`RequestError`]: Malformed requests and unsupported operations
//!
//! The unified [`Error`] enum wraps all domain errors and is returned
//! by most manager methods.
//!
//! Faults detected by the hardware (missed events, queue threshold, bus
//! errors) are never returned here. They are delivered through the TCC and
//! global error callbacks.

// =============================================================================
// State Errors
// =============================================================================

/// Lifecycle errors
///
/// These errors occur when an operation is attempted in the wrong phase of
/// the controller or instance lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StateError {
    /// Operation not valid in the current lifecycle state
    InvalidState,
    /// Every instance slot of the controller is in use
    MaxInstancesOpened,
    /// A master instance is already open on this controller
    MasterAlreadyExists,
}

impl core::fmt::Display for StateError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl StateError {
    /// Returns a human-readable description of the error
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            StateError::InvalidState => "invalid lifecycle state",
            StateError::MaxInstancesOpened => "maximum instances opened",
            StateError::MasterAlreadyExists => "master instance already exists",
        }
    }
}

// =============================================================================
// Resource Errors
// =============================================================================

/// Resource allocation errors
///
/// These errors relate to the owned / reserved / available bitmaps of an
/// instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ResourceError {
    /// The id is not in this instance's owned set
    NotOwned,
    /// Free of a resource that is already available
    AlreadyFree,
    /// Allocation of a specific resource that is already allocated
    AlreadyBooked,
    /// No free resource found for an "any" request
    AllUnavailable,
    /// No contiguous run found, or a specific id in the run conflicts
    SpecifiedNotAvailable,
    /// A direct mapping referenced a channel or PaRAM set that is not allocated
    NotAllocated,
}

impl core::fmt::Display for ResourceError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ResourceError {
    /// Returns a human-readable description of the error
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            ResourceError::NotOwned => "resource not owned",
            ResourceError::AlreadyFree => "resource already free",
            ResourceError::AlreadyBooked => "resource already booked",
            ResourceError::AllUnavailable => "all resources unavailable",
            ResourceError::SpecifiedNotAvailable => "specified resource not available",
            ResourceError::NotAllocated => "resource not allocated",
        }
    }
}

// =============================================================================
// Request Errors
// =============================================================================

/// Request errors
///
/// These errors occur when a call carries bad arguments or asks for
/// something the platform cannot do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RequestError {
    /// Bad handle, out-of-range id or malformed descriptor
    InvalidParameter,
    /// A callback is already registered for the TCC
    CallbackAlreadyRegistered,
    /// The platform has no channel-to-PaRAM mapping registers
    FeatureUnsupported,
    /// Timed wait expired
    Timeout,
}

impl core::fmt::Display for RequestError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl RequestError {
    /// Returns a human-readable description of the error
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            RequestError::InvalidParameter => "invalid parameter",
            RequestError::CallbackAlreadyRegistered => "callback already registered",
            RequestError::FeatureUnsupported => "feature unsupported",
            RequestError::Timeout => "operation timed out",
        }
    }
}

// =============================================================================
// Unified Error Type
// =============================================================================

/// This enum wraps all domain-specific errors for unified error handling.
///
/// Match on the inner domain error for specific handling:
/// ```ignore
/// match result {
///     Err(Error::State(StateError::MasterAlreadyExists)) => { /* ... */ }
///     Err(Error::Resource(ResourceError::AllUnavailable)) => { /* ... */ }
///     Err(Error::Request(RequestError::InvalidParameter)) => { /* ... */ }
///     _ => {}
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Lifecycle error
    State(StateError),
    /// Resource error
    Resource(ResourceError),
    /// Request error
    Request(RequestError),
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::State(e) => write!(f, "state: {}", e.as_str()),
            Error::Resource(e) => write!(f, "resource: {}", e.as_str()),
            Error::Request(e) => write!(f, "request: {}", e.as_str()),
        }
    }
}

// From impls for automatic conversion
impl From<StateError> for Error {
    fn from(e: StateError) -> Self {
        Error::State(e)
    }
}

impl From<ResourceError> for Error {
    fn from(e: ResourceError) -> Self {
        Error::Resource(e)
    }
}

impl From<RequestError> for Error {
    fn from(e: RequestError) -> Self {
        Error::Request(e)
    }
}

/// Result type alias for resource manager operations
pub type Result<T> = core::result::Result<T, Error>;

/// Result type alias for lifecycle operations
pub type StateResult<T> = core::result::Result<T, StateError>;

/// Result type alias for bitmap operations
pub type ResourceResult<T> = core::result::Result<T, ResourceError>;

/// Result type alias for request validation
pub type RequestResult<T> = core::result::Result<T, RequestError>;

// =============================================================================
// Unit Tests
// =============================================================================
