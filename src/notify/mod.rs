//! Outgoing notification surface: template catalog, message composition,
//! and the delivery boundary.

pub mod mailer;
pub mod message;
pub mod template;

pub use mailer::{Notifier, SendmailNotifier};
pub use message::{OutgoingMessage, compose};
pub use template::{RenderVars, StateTemplates, TemplateCatalog};
