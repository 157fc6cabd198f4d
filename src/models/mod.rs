mod account;
mod response;
mod work;

pub use account::{Account, AccountCredentials, AccountGroup, AccountStatus};
#[allow(unused_imports)]
pub use response::{
    ActionResponse, ErrorKind, LOG_CANCELLED, LOG_LOCKED, LOG_SUSPENDED, LOG_TRANSPORT,
    LOG_UNAUTHENTICATED, LOG_UNKNOWN,
};
pub use work::{select_index, ItemShape, Selection, WorkItem};
