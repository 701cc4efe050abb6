use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::db::{CreateUser, PasswordResetRepository, User, UserRepository};
use crate::error::{AppError, AppResult};
use crate::AppState;

/// Random bytes in a password reset token (hex encoded on the wire).
const RESET_TOKEN_BYTES: usize = 32;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    pub iat: usize,
}

/// A reset token that was just issued. Only its hash is persisted.
#[derive(Debug, Clone)]
pub struct IssuedReset {
    pub token: String,
    pub reset_url: String,
}

// ===== Validation helpers =====

/// Trim and lowercase an email, then check it looks like `local@domain.tld`.
pub fn normalize_email(raw: &str) -> AppResult<String> {
    let email = raw.trim().to_lowercase();
    let invalid = || AppError::Validation("invalid email format".to_string());

    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    let local_ok = !local.is_empty()
        && local
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "._%+-".contains(c));
    let (host, tld) = domain.rsplit_once('.').ok_or_else(invalid)?;
    let host_ok = !host.is_empty()
        && host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-');
    let tld_ok = tld.len() >= 2 && tld.chars().all(|c| c.is_ascii_alphabetic());

    if local_ok && host_ok && tld_ok {
        Ok(email)
    } else {
        Err(invalid())
    }
}

pub fn validate_password(password: &str) -> AppResult<()> {
    let fail = |msg: &str| Err(AppError::Validation(msg.to_string()));

    if password.len() < 8 {
        return fail("password must be at least 8 characters");
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        return fail("password must contain at least one uppercase letter");
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        return fail("password must contain at least one lowercase letter");
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return fail("password must contain at least one number");
    }
    Ok(())
}

pub struct AuthService;

impl AuthService {
    /// Generate a random hex string from `bytes` random bytes.
    pub fn generate_random_string(bytes: usize) -> String {
        let mut buf = vec![0u8; bytes];
        rand::thread_rng().fill_bytes(&mut buf);
        hex::encode(buf)
    }

    pub fn hash_token(token: &str) -> String {
        hex::encode(Sha256::digest(token.as_bytes()))
    }

    pub async fn hash_password(password: &str, cost: u32) -> AppResult<String> {
        let password = password.to_string();
        tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
            .await
            .map_err(|e| AppError::Internal(e.into()))?
            .map_err(AppError::Password)
    }

    pub async fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
        let (password, hash) = (password.to_string(), hash.to_string());
        tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
            .await
            .map_err(|e| AppError::Internal(e.into()))?
            .map_err(AppError::Password)
    }

    /// Issue a session JWT for the user.
    pub fn create_token(state: &AppState, user_id: &str) -> AppResult<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now.timestamp() as usize,
            exp: (now + Duration::hours(state.config.jwt.expiration_hours)).timestamp() as usize,
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(state.config.jwt.secret.as_bytes()),
        )?;
        Ok(token)
    }

    /// Decode and validate a session JWT
    pub fn decode_token(state: &AppState, token: &str) -> AppResult<Claims> {
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(state.config.jwt.secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(data.claims)
    }

    pub async fn register(
        state: &AppState,
        email: &str,
        password: &str,
        name: &str,
    ) -> AppResult<User> {
        let email = normalize_email(email)?;
        validate_password(password)?;

        let password_hash = Self::hash_password(password, state.config.auth.bcrypt_cost).await?;
        let name = name.trim();

        let user = UserRepository::create(
            &state.db,
            CreateUser {
                email,
                password_hash,
                name: if name.is_empty() { "User".to_string() } else { name.to_string() },
            },
            state.now(),
        )
        .await?;

        tracing::info!("Registered user {}", user.id);
        Ok(user)
    }

    /// Returns a session token. Unknown email and wrong password look the same.
    pub async fn login(state: &AppState, email: &str, password: &str) -> AppResult<String> {
        let email = email.trim().to_lowercase();
        let user = UserRepository::find_by_email(&state.db, &email)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        if !Self::verify_password(password, &user.password_hash).await? {
            tracing::debug!("Failed login for user {}", user.id);
            return Err(AppError::InvalidCredentials);
        }

        Self::create_token(state, &user.id)
    }

    /// Start a password reset. `None` when no account has that email.
    pub async fn request_reset(state: &AppState, email: &str) -> AppResult<Option<IssuedReset>> {
        let email = normalize_email(email)?;
        let Some(user) = UserRepository::find_by_email(&state.db, &email).await? else {
            return Ok(None);
        };

        let token = Self::generate_random_string(RESET_TOKEN_BYTES);
        let now = state.now();
        let expires_at = now + Duration::minutes(state.config.auth.password_reset_ttl_minutes);

        PasswordResetRepository::replace_for_user(
            &state.db,
            &user.id,
            &Self::hash_token(&token),
            expires_at,
            now,
        )
        .await?;

        let reset_url = format!(
            "{}/reset-password?token={}",
            state.config.server.frontend_url.trim_end_matches('/'),
            urlencoding::encode(&token)
        );
        // No mail transport yet; the link goes to the log.
        tracing::info!("Password reset link for user {}: {}", user.id, reset_url);

        Ok(Some(IssuedReset { token, reset_url }))
    }

    pub async fn reset_password(state: &AppState, token: &str, new_password: &str) -> AppResult<()> {
        let token = token.trim();
        if token.is_empty() {
            return Err(AppError::BadRequest("Token is required".to_string()));
        }
        validate_password(new_password)?;

        let now = state.now();
        let reset = PasswordResetRepository::find_valid(&state.db, &Self::hash_token(token), now)
            .await?
            .ok_or_else(|| AppError::BadRequest("Invalid or expired token".to_string()))?;

        let hash = Self::hash_password(new_password, state.config.auth.bcrypt_cost).await?;
        UserRepository::update_password(&state.db, &reset.user_id, &hash, now).await?;
        PasswordResetRepository::delete_for_user(&state.db, &reset.user_id).await?;

        tracing::info!("Password reset for user {}", reset.user_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_state;

    #[test]
    fn email_rules() {
        assert_eq!(normalize_email("  Jane.Doe+x@Example.COM ").unwrap(), "jane.doe+x@example.com");
        assert!(normalize_email("no-at-sign").is_err());
        assert!(normalize_email("a@b").is_err());
        assert!(normalize_email("a@b.c").is_err());
        assert!(normalize_email("@example.com").is_err());
        assert!(normalize_email("a b@example.com").is_err());
    }

    #[test]
    fn password_rules() {
        assert!(validate_password("Sh0rt").is_err());
        assert!(validate_password("alllowercase1").is_err());
        assert!(validate_password("ALLUPPERCASE1").is_err());
        assert!(validate_password("NoDigitsHere").is_err());
        assert!(validate_password("Good3nough").is_ok());
    }

    #[test]
    fn reset_tokens_are_random_hex() {
        let a = AuthService::generate_random_string(RESET_TOKEN_BYTES);
        let b = AuthService::generate_random_string(RESET_TOKEN_BYTES);
        assert_eq!(a.len(), 64);
        assert_ne!(a, b);
        assert_eq!(AuthService::hash_token(&a).len(), 64);
        assert_ne!(AuthService::hash_token(&a), a);
    }

    #[tokio::test]
    async fn register_then_login() {
        let (state, _clock, _user) = test_state().await;

        let user = AuthService::register(&state, "New@Example.com", "Passw0rdX", " Ann ")
            .await
            .unwrap();
        assert_eq!(user.email, "new@example.com");
        assert_eq!(user.name, "Ann");

        let token = AuthService::login(&state, "new@example.com", "Passw0rdX")
            .await
            .unwrap();
        let claims = AuthService::decode_token(&state, &token).unwrap();
        assert_eq!(claims.sub, user.id);

        assert!(matches!(
            AuthService::login(&state, "new@example.com", "WrongPass1").await,
            Err(AppError::InvalidCredentials)
        ));
        assert!(matches!(
            AuthService::login(&state, "nobody@example.com", "Passw0rdX").await,
            Err(AppError::InvalidCredentials)
        ));
        assert!(matches!(
            AuthService::register(&state, "new@example.com", "Passw0rdX", "Dup").await,
            Err(AppError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn reset_flow_is_single_use_and_expires() {
        let (state, clock, _user) = test_state().await;
        AuthService::register(&state, "r@example.com", "Passw0rdX", "R")
            .await
            .unwrap();

        assert!(AuthService::request_reset(&state, "missing@example.com")
            .await
            .unwrap()
            .is_none());

        let issued = AuthService::request_reset(&state, "r@example.com")
            .await
            .unwrap()
            .unwrap();
        assert!(issued.reset_url.ends_with(&format!("/reset-password?token={}", issued.token)));

        AuthService::reset_password(&state, &issued.token, "N3wPassword")
            .await
            .unwrap();
        AuthService::login(&state, "r@example.com", "N3wPassword")
            .await
            .unwrap();
        assert!(matches!(
            AuthService::reset_password(&state, &issued.token, "N3wPassword").await,
            Err(AppError::BadRequest(_))
        ));

        let expired = AuthService::request_reset(&state, "r@example.com")
            .await
            .unwrap()
            .unwrap();
        clock.advance(Duration::minutes(61));
        assert!(matches!(
            AuthService::reset_password(&state, &expired.token, "An0therPass").await,
            Err(AppError::BadRequest(_))
        ));
    }
}
