pub mod enums;
pub mod message;
pub mod name;
pub mod record;
pub mod rrset;

pub use enums::{RecordClass, RecordType, ResponseCode};
pub use message::{Flags, Header, Question, SMessage, Section};
pub use name::Name;
pub use record::{DnskeyData, DsData, Nsec3Data, NsecData, Record, RrsigData, TypeBitmap};
pub use rrset::SRRset;
