pub mod domain;
pub mod ports;
pub mod status;
pub mod validation;

pub use domain::{
    DeliveryChannel, NewNote, Note, NoteUpdate, SettingsUpdate, UploadTarget, User, UserCredentials,
    UserSettings, DEFAULT_FOLDER,
};
pub use ports::{
    DatabaseService, MailSender, NotificationSender, PortError, PortResult, UploadSigner,
};
pub use status::Status;
