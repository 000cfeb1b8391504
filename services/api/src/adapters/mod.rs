pub mod db;
pub mod mail;
pub mod memory;
pub mod sms;
pub mod uploads;

pub use db::DbAdapter;
pub use mail::SmtpMailAdapter;
pub use memory::InMemoryDb;
pub use sms::TwilioSmsAdapter;
pub use uploads::HmacUploadSigner;
