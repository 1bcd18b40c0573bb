use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Role {
    Seller,
    Buyer,
}

impl Role {
    pub fn counterpart(self) -> Role {
        match self {
            Role::Seller => Role::Buyer,
            Role::Buyer => Role::Seller,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Seller => "seller",
            Role::Buyer => "buyer",
        }
    }

    /// Thread column holding the participant with this role.
    pub(crate) fn participant_column(self) -> &'static str {
        match self {
            Role::Seller => "seller_id",
            Role::Buyer => "buyer_id",
        }
    }

    /// Thread column holding this role's unread counter.
    pub(crate) fn unread_column(self) -> &'static str {
        match self {
            Role::Seller => "seller_unread_count",
            Role::Buyer => "buyer_unread_count",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: String,
    pub username: String,
    pub role: Role,
}

/// An authenticated user acting through the inbox of `role`.
#[derive(Debug, Clone)]
pub struct Caller {
    pub user: AuthUser,
    pub role: Role,
}

impl Caller {
    pub fn id(&self) -> &str {
        &self.user.id
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: String,
    pub username: String,
    pub role: Role,
}
