use anyhow::anyhow;
use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString,
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand_core::OsRng;
use tracing::{info, warn};

use yoochat_db::models::{ProfileRow, UserRow};
use yoochat_db::queries::users::{self, ProfileUpdate};
use yoochat_types::api::{Claims, LoginResponse, UserProfile, UserSummary};

use crate::validation::{check_email, check_password, non_blank, normalize_email};
use crate::{Social, SocialError, SocialResult};

/// Sessions last one hour.
pub const TOKEN_TTL_SECS: i64 = 60 * 60;

/// Registration form. Fields are optional so a missing one is a 400, not a
/// parse failure.
#[derive(Debug, Default)]
pub struct NewUser {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    /// Already-stored upload path, e.g. `uploads/<file>`.
    pub profile_image: Option<String>,
}

/// Profile update form; absent fields are left unchanged.
#[derive(Debug, Default)]
pub struct ProfileChanges {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub profile_image: Option<String>,
}

/// Result of a profile update. `replaced_image` is the upload path the new
/// image superseded, for the caller to remove.
#[derive(Debug)]
pub struct UpdatedProfile {
    pub user: UserProfile,
    pub replaced_image: Option<String>,
}

impl Social {
    pub async fn register(&self, new: NewUser) -> SocialResult<UserProfile> {
        let (Some(username), Some(email), Some(password)) = (
            non_blank(new.username),
            non_blank(new.email),
            new.password.filter(|p| !p.is_empty()),
        ) else {
            return Err(SocialError::invalid("All fields are required"));
        };

        let email = normalize_email(&email);
        check_email(&email)?;
        check_password(&password)?;
        let profile_image = new.profile_image;

        self.blocking(move |db| {
            let hash = hash_password(&password)?;

            let user = db.with_tx(|tx| {
                if users::query_user_by_username(tx, &username)?.is_some() {
                    return Err(SocialError::invalid("Username already taken"));
                }
                if users::query_user_by_email(tx, &email)?.is_some() {
                    return Err(SocialError::invalid("Email already registered"));
                }
                Ok(users::insert_user(
                    tx,
                    &username,
                    &email,
                    &hash,
                    profile_image.as_deref(),
                )?)
            })?;

            info!("Registered user {} ({})", user.username, user.user_id);
            Ok(user_profile(&user))
        })
        .await
    }

    pub async fn login(
        &self,
        email: Option<String>,
        password: Option<String>,
    ) -> SocialResult<LoginResponse> {
        let (Some(email), Some(password)) =
            (non_blank(email), password.filter(|p| !p.is_empty()))
        else {
            return Err(SocialError::invalid("Email and password are required"));
        };
        let secret = self.jwt_secret.clone();

        self.blocking(move |db| {
            let invalid = || SocialError::invalid("Invalid credentials");

            let user = db
                .get_user_by_email(&normalize_email(&email))?
                .ok_or_else(invalid)?;
            if !verify_password(&password, &user.password) {
                return Err(invalid());
            }

            let token = issue_token(&secret, user.user_id, &user.username)?;
            info!("User {} logged in", user.user_id);

            Ok(LoginResponse {
                message: "Login successful".to_string(),
                token,
                user_id: user.user_id,
                username: user.username,
                profile_image: user.profile_image,
                user_email: user.email,
            })
        })
        .await
    }

    /// Signature and expiry check for a bearer token.
    pub fn verify_token(&self, token: &str) -> SocialResult<Claims> {
        decode_token(&self.jwt_secret, token).map_err(|e| {
            warn!("Rejected token: {}", e);
            SocialError::forbidden("Invalid token")
        })
    }

    pub async fn profile(&self, user_id: i64) -> SocialResult<UserProfile> {
        self.blocking(move |db| {
            db.get_user_by_id(user_id)?
                .map(|u| user_profile(&u))
                .ok_or_else(|| SocialError::not_found("User not found"))
        })
        .await
    }

    pub async fn user_by_username(&self, username: String) -> SocialResult<UserProfile> {
        self.blocking(move |db| {
            db.get_user_by_username(username.trim())?
                .map(|u| user_profile(&u))
                .ok_or_else(|| SocialError::not_found("User not found"))
        })
        .await
    }

    pub async fn update_profile(
        &self,
        user_id: i64,
        changes: ProfileChanges,
    ) -> SocialResult<UpdatedProfile> {
        let username = non_blank(changes.username);
        let email = non_blank(changes.email).map(|e| normalize_email(&e));
        if let Some(email) = &email {
            check_email(email)?;
        }
        let password = changes.password.filter(|p| !p.is_empty());
        if let Some(password) = &password {
            check_password(password)?;
        }
        let profile_image = changes.profile_image;

        self.blocking(move |db| {
            let hash = password.as_deref().map(hash_password).transpose()?;

            let (user, previous_image) = db.with_tx(|tx| {
                let Some(current) = users::query_user_by_id(tx, user_id)? else {
                    return Err(SocialError::not_found("User not found"));
                };
                if let Some(name) = &username {
                    if let Some(other) = users::query_user_by_username(tx, name)? {
                        if other.user_id != user_id {
                            return Err(SocialError::invalid("Username already taken"));
                        }
                    }
                }
                if let Some(email) = &email {
                    if let Some(other) = users::query_user_by_email(tx, email)? {
                        if other.user_id != user_id {
                            return Err(SocialError::invalid("Email already registered"));
                        }
                    }
                }

                let update = ProfileUpdate {
                    username: username.as_deref(),
                    email: email.as_deref(),
                    password_hash: hash.as_deref(),
                    profile_image: profile_image.as_deref(),
                };
                let user = users::update_profile(tx, user_id, &update)?
                    .ok_or_else(|| SocialError::not_found("User not found"))?;
                Ok((user, current.profile_image))
            })?;

            info!("Updated profile of user {}", user_id);
            let replaced_image = previous_image.filter(|old| {
                profile_image.is_some() && user.profile_image.as_deref() != Some(old.as_str())
            });
            Ok(UpdatedProfile {
                user: user_profile(&user),
                replaced_image,
            })
        })
        .await
    }
}

/// Argon2id with a fresh salt, PHC string out.
pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| anyhow!("password hashing failed: {e}"))
}

/// False on mismatch and on a stored hash that does not parse.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    let parsed = match PasswordHash::new(stored_hash) {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!("Unparseable password hash: {}", e);
            return false;
        }
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// HS256 token carrying the user id and username.
pub fn issue_token(secret: &str, user_id: i64, username: &str) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id,
        username: username.to_string(),
        exp: (chrono::Utc::now() + chrono::Duration::seconds(TOKEN_TTL_SECS)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

pub fn decode_token(secret: &str, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
}

pub(crate) fn user_profile(user: &UserRow) -> UserProfile {
    UserProfile {
        user_id: user.user_id,
        username: user.username.clone(),
        email: user.email.clone(),
        profile_image: user.profile_image.clone(),
    }
}

pub(crate) fn profile_view(row: ProfileRow) -> UserProfile {
    UserProfile {
        user_id: row.user_id,
        username: row.username,
        email: row.email,
        profile_image: row.profile_image,
    }
}

pub(crate) fn summary_view(row: ProfileRow) -> UserSummary {
    UserSummary {
        user_id: row.user_id,
        username: row.username,
        profile_image: row.profile_image,
    }
}
