pub mod audio;
pub mod config;
pub mod issuer;
pub mod profile;
pub mod realtime;
pub mod session;
pub mod transport;

pub use audio::{
    AudioBackend, AudioBackendConfig, AudioBackendFactory, AudioFrame, AudioSink, CaptureDevices,
};
pub use config::Config;
pub use issuer::{create_router, AppState, IssuerError};
pub use profile::Profile;
pub use realtime::{ClientEvent, ServerEvent, SessionCredential};
pub use session::{
    ConnectionState, SessionCommand, SessionConfig, SessionController, SessionDeps, SessionError,
};
pub use transport::{PeerTransport, TransportEvent, TransportFactory};
