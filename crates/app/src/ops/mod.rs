pub mod get;
pub mod hub_info;
pub mod init;
pub mod ls;
pub mod put;
pub mod rm;
pub mod version;

pub use get::Get;
pub use hub_info::HubInfo;
pub use init::Init;
pub use ls::Ls;
pub use put::Put;
pub use rm::Rm;
pub use version::Version;
