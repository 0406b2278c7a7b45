pub mod consultation;
pub mod enums;
pub mod referral;
pub mod result;
pub mod soap;
pub mod summary;
pub mod trial;

pub use consultation::*;
pub use enums::*;
pub use referral::*;
pub use result::*;
pub use soap::*;
pub use summary::*;
pub use trial::*;
