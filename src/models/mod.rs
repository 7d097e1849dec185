pub mod approval_workflow;
pub mod device;
pub mod facility;
pub mod fleet;
pub mod location;
pub mod meeting;
pub mod organization;
pub mod request;
pub mod room;
pub mod setting;
pub mod sync;
pub mod transport;
pub mod transport_company;
pub mod trip;
pub mod user;
pub mod voucher;

pub use approval_workflow::*;
pub use device::*;
pub use facility::*;
pub use fleet::*;
pub use location::*;
pub use meeting::*;
pub use organization::*;
pub use request::*;
pub use room::*;
pub use setting::*;
pub use sync::*;
pub use transport::*;
pub use transport_company::*;
pub use trip::*;
pub use user::*;
pub use voucher::*;
