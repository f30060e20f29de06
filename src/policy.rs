//! Access policy.
//!
//! Pure decisions over who may do what. Nothing here touches the database:
//! callers load the target first and pass its ownership in as a [`Resource`].

use serde::Serialize;
use std::fmt;

/// Identity behind a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Actor {
    Anonymous,
    Member(Member),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Member {
    pub id: i64,
    pub username: String,
    pub verified: bool,
}

impl Actor {
    pub fn member(&self) -> Option<&Member> {
        match self {
            Actor::Anonymous => None,
            Actor::Member(member) => Some(member),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.member().is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Index and about pages.
    ReadPublicPage,
    /// Login, register and password reset flows.
    Authenticate,
    Logout,
    ViewProfile,
    EditProfile,
    AttemptVerification,
    ReadContent,
    CreateContent,
    Comment,
    Like,
    EditContent,
    DeleteContent,
}

impl Action {
    fn needs_verification(self) -> bool {
        matches!(
            self,
            Action::ReadContent
                | Action::CreateContent
                | Action::Comment
                | Action::Like
                | Action::EditContent
                | Action::DeleteContent
        )
    }

    fn needs_ownership(self) -> bool {
        matches!(self, Action::EditContent | Action::DeleteContent)
    }
}

/// Ownership of the item an action targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resource {
    pub author_id: i64,
}

impl Resource {
    pub fn owned_by(author_id: i64) -> Self {
        Self { author_id }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    Unauthenticated,
    Unverified,
    NotOwner,
    AlreadyAuthenticated,
}

impl Denial {
    /// Where a denied actor is sent instead.
    pub fn entry_point(self) -> &'static str {
        match self {
            Denial::Unauthenticated => "/login",
            Denial::Unverified => "/verification",
            Denial::NotOwner => "/discussion",
            Denial::AlreadyAuthenticated => "/",
        }
    }
}

impl fmt::Display for Denial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unauthenticated => write!(f, "login required"),
            Self::Unverified => write!(f, "verification required"),
            Self::NotOwner => write!(f, "only the author may do that"),
            Self::AlreadyAuthenticated => write!(f, "already logged in"),
        }
    }
}

impl std::error::Error for Denial {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(Denial),
}

impl Decision {
    pub fn into_result(self) -> Result<(), Denial> {
        match self {
            Decision::Allow => Ok(()),
            Decision::Deny(denial) => Err(denial),
        }
    }
}

/// Decide whether `actor` may perform `action`.
///
/// For edit and delete, passing no target evaluates only the actor gate;
/// ownership is decided once the target is known.
pub fn can_act(actor: &Actor, action: Action, target: Option<&Resource>) -> Decision {
    let member = match (actor, action) {
        (Actor::Anonymous, Action::ReadPublicPage | Action::Authenticate) => {
            return Decision::Allow
        }
        (Actor::Anonymous, _) => return Decision::Deny(Denial::Unauthenticated),
        (Actor::Member(_), Action::Authenticate) => {
            return Decision::Deny(Denial::AlreadyAuthenticated)
        }
        (Actor::Member(member), _) => member,
    };

    if action.needs_verification() && !member.verified {
        return Decision::Deny(Denial::Unverified);
    }

    if action.needs_ownership() {
        if let Some(resource) = target {
            if resource.author_id != member.id {
                return Decision::Deny(Denial::NotOwner);
            }
        }
    }

    Decision::Allow
}

/// [`can_act`] for callers that want `?`. Returns the acting member.
pub fn authorize<'a>(
    actor: &'a Actor,
    action: Action,
    target: Option<&Resource>,
) -> Result<Option<&'a Member>, Denial> {
    can_act(actor, action, target).into_result()?;
    Ok(actor.member())
}

/// Like [`authorize`] for actions that always need a logged-in member.
pub fn require_member<'a>(
    actor: &'a Actor,
    action: Action,
    target: Option<&Resource>,
) -> Result<&'a Member, Denial> {
    authorize(actor, action, target)?.ok_or(Denial::Unauthenticated)
}
