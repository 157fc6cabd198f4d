mod client;
mod interpret;

#[allow(unused_imports)]
pub use client::{ActionClient, HttpActionClient, TransportError};
pub use interpret::{interpret_response, Outcome};

use serde_json::{json, Map, Value};

use crate::models::{AccountCredentials, ActionResponse, ItemShape, Selection, WorkItem};

/// Builds the request for one action kind.
pub trait ActionPayloadBuilder: Send + Sync {
    fn name(&self) -> &str;

    /// Path on the action server, e.g. `/api/like`.
    fn endpoint(&self) -> &str;

    /// Shape of work item this action consumes.
    fn item_shape(&self) -> ItemShape;

    fn selection(&self) -> Selection {
        Selection::InOrder
    }

    /// Request body: `auth_token` and `proxy` plus the action's own fields.
    /// `item` is already resolved, so it is never a `Pool`.
    fn build(&self, item: &WorkItem, account: &AccountCredentials) -> Value;
}

/// Turns a server response into an account outcome.
pub trait ResponseInterpreter: Send + Sync {
    fn interpret(&self, response: &ActionResponse) -> Outcome {
        interpret_response(response)
    }
}

/// Everything the runner needs to drive one kind of action.
pub trait Action: ActionPayloadBuilder + ResponseInterpreter {}

impl<T: ActionPayloadBuilder + ResponseInterpreter> Action for T {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileField {
    Background,
    Birthdate,
    Description,
    Location,
    Name,
    Password,
    ProfilePicture,
    Username,
}

impl ProfileField {
    pub const ALL: [ProfileField; 8] = [
        ProfileField::Background,
        ProfileField::Birthdate,
        ProfileField::Description,
        ProfileField::Location,
        ProfileField::Name,
        ProfileField::Password,
        ProfileField::ProfilePicture,
        ProfileField::Username,
    ];

    fn endpoint(&self) -> &'static str {
        match self {
            ProfileField::Background => "/api/change-background",
            ProfileField::Birthdate => "/api/change-birthdate",
            ProfileField::Description => "/api/change-description",
            ProfileField::Location => "/api/change-location",
            ProfileField::Name => "/api/change-name",
            ProfileField::Password => "/api/change-password",
            ProfileField::ProfilePicture => "/api/change-profile-picture",
            ProfileField::Username => "/api/change-username",
        }
    }

    fn body_key(&self) -> &'static str {
        match self {
            ProfileField::Background | ProfileField::ProfilePicture => "picture_base64_encoded",
            ProfileField::Birthdate => "new_birthdate",
            ProfileField::Description => "new_description",
            ProfileField::Location => "new_location",
            ProfileField::Name => "new_name",
            ProfileField::Password => "new_password",
            ProfileField::Username => "new_username",
        }
    }

    fn name(&self) -> &'static str {
        match self {
            ProfileField::Background => "change-background",
            ProfileField::Birthdate => "change-birthdate",
            ProfileField::Description => "change-description",
            ProfileField::Location => "change-location",
            ProfileField::Name => "change-name",
            ProfileField::Password => "change-password",
            ProfileField::ProfilePicture => "change-profile-picture",
            ProfileField::Username => "change-username",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Follow,
    Unfollow,
    Like,
    Unlike,
    Retweet,
    Unretweet,
    Tweet,
    Comment,
    Vote,
    ChangeProfile(ProfileField),
}

impl ActionKind {
    pub fn all() -> Vec<ActionKind> {
        let mut kinds = vec![
            ActionKind::Follow,
            ActionKind::Unfollow,
            ActionKind::Like,
            ActionKind::Unlike,
            ActionKind::Retweet,
            ActionKind::Unretweet,
            ActionKind::Tweet,
            ActionKind::Comment,
            ActionKind::Vote,
        ];
        kinds.extend(ProfileField::ALL.into_iter().map(ActionKind::ChangeProfile));
        kinds
    }
}

impl ActionPayloadBuilder for ActionKind {
    fn name(&self) -> &str {
        match self {
            ActionKind::Follow => "follow",
            ActionKind::Unfollow => "unfollow",
            ActionKind::Like => "like",
            ActionKind::Unlike => "unlike",
            ActionKind::Retweet => "retweet",
            ActionKind::Unretweet => "unretweet",
            ActionKind::Tweet => "tweet",
            ActionKind::Comment => "comment",
            ActionKind::Vote => "vote",
            ActionKind::ChangeProfile(field) => field.name(),
        }
    }

    fn endpoint(&self) -> &str {
        match self {
            ActionKind::Follow => "/api/follow",
            ActionKind::Unfollow => "/api/unfollow",
            ActionKind::Like => "/api/like",
            ActionKind::Unlike => "/api/unlike",
            ActionKind::Retweet => "/api/retweet",
            ActionKind::Unretweet => "/api/unretweet",
            ActionKind::Tweet => "/api/tweet",
            ActionKind::Comment => "/api/comment",
            ActionKind::Vote => "/api/vote_poll",
            ActionKind::ChangeProfile(field) => field.endpoint(),
        }
    }

    fn item_shape(&self) -> ItemShape {
        match self {
            ActionKind::Follow
            | ActionKind::Unfollow
            | ActionKind::Like
            | ActionKind::Unlike
            | ActionKind::Retweet
            | ActionKind::Unretweet => ItemShape::Target,
            ActionKind::Tweet | ActionKind::ChangeProfile(_) => ItemShape::Text,
            ActionKind::Comment => ItemShape::Pool,
            ActionKind::Vote => ItemShape::Reply,
        }
    }

    fn selection(&self) -> Selection {
        match self {
            ActionKind::Tweet => Selection::Pooled,
            _ => Selection::InOrder,
        }
    }

    fn build(&self, item: &WorkItem, account: &AccountCredentials) -> Value {
        let mut body = Map::new();
        body.insert("auth_token".into(), json!(account.token));
        body.insert("proxy".into(), json!(account.proxy));

        let link = item.link().unwrap_or_default();
        let text = item.body().unwrap_or_default();

        match self {
            ActionKind::Follow | ActionKind::Unfollow => {
                body.insert("username".into(), json!(link.trim_start_matches('@')));
            }
            ActionKind::Like
            | ActionKind::Unlike
            | ActionKind::Retweet
            | ActionKind::Unretweet => {
                body.insert("tweet_link".into(), json!(link));
            }
            ActionKind::Tweet => {
                body.insert("content".into(), json!(text));
            }
            ActionKind::Comment => {
                body.insert("tweet_link".into(), json!(link));
                body.insert("content".into(), json!(text));
            }
            ActionKind::Vote => {
                body.insert("tweet_link".into(), json!(link));
                body.insert("answer".into(), json!(text));
            }
            ActionKind::ChangeProfile(field) => {
                if *field == ProfileField::Password {
                    body.insert("old_password".into(), json!(""));
                }
                body.insert(field.body_key().into(), json!(text));
            }
        }

        Value::Object(body)
    }
}

impl ResponseInterpreter for ActionKind {
    fn interpret(&self, response: &ActionResponse) -> Outcome {
        let mut outcome = interpret_response(response);
        if *self == ActionKind::ChangeProfile(ProfileField::Password) && response.status {
            outcome.new_token = response.auth_token().map(str::to_string);
        }
        outcome
    }
}
