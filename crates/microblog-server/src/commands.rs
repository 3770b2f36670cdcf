use std::sync::Arc;

use anyhow::{Context, Result, anyhow, bail};
use microblog_crypto::PasswordHasher;
use microblog_sensor::{HardwareSensor, ReadingProvider, SensorBackend, SensorDriver};
use microblog_types::{Account, Post, PostBody, PostQuery, Repository};
use tracing::info;

use crate::config::SensorConfig;

// -- Accounts --

pub fn register<R: Repository>(
    repo: &R,
    hasher: &PasswordHasher,
    username: &str,
    email: &str,
    password: &str,
) -> Result<Account> {
    let mut account = Account::new(username, email)?;
    account.set_password_with(hasher, password)?;
    repo.save(&mut account)?;

    info!("Registered {}", account);
    Ok(account)
}

pub fn change_password<R: Repository>(
    repo: &R,
    hasher: &PasswordHasher,
    username: &str,
    password: &str,
) -> Result<()> {
    let mut account = require_account(repo, username)?;
    account.set_password_with(hasher, password)?;
    repo.save(&mut account)?;

    info!("Password changed for {}", account);
    Ok(())
}

/// Same error for unknown usernames and wrong passwords.
pub fn login<R: Repository>(repo: &R, username: &str, password: &str) -> Result<Account> {
    match repo.find_account_by_username(username.trim())? {
        Some(account) if account.check_password(password) => Ok(account),
        _ => bail!("invalid username or password"),
    }
}

pub fn whoami<R: Repository>(repo: &R, subject: &str) -> Result<Option<Account>> {
    Ok(repo.load_account(subject)?)
}

pub fn delete_account<R: Repository>(repo: &R, username: &str) -> Result<()> {
    let account = require_account(repo, username)?;
    let id = account_id(&account)?;
    let posts = repo.count_posts_for(id)?;

    repo.delete_account(id)?;
    info!("Deleted {} and {} post(s)", account, posts);
    Ok(())
}

// -- Posts --

pub fn post<R: Repository>(repo: &R, username: &str, body: &str) -> Result<Post> {
    let body = PostBody::new(body)?;
    let account = require_account(repo, username)?;
    Ok(repo.create_post(account_id(&account)?, &body)?)
}

pub fn posts<R: Repository>(repo: &R, username: &str, query: PostQuery) -> Result<(u64, Vec<Post>)> {
    let account = require_account(repo, username)?;
    let id = account_id(&account)?;
    Ok((repo.count_posts_for(id)?, repo.list_posts_for(id, query)?))
}

fn require_account<R: Repository>(repo: &R, username: &str) -> Result<Account> {
    let username = username.trim();
    repo.find_account_by_username(username)?
        .with_context(|| format!("no account named '{username}'"))
}

fn account_id(account: &Account) -> Result<i64> {
    account
        .id
        .ok_or_else(|| anyhow!("{} has not been saved", account))
}

// -- Sensor --

pub fn build_provider(config: &SensorConfig) -> Result<ReadingProvider> {
    match config.backend {
        SensorBackend::Simulated => Ok(ReadingProvider::simulated()),
        SensorBackend::Hardware => {
            let sensor = HardwareSensor::new(config.pin, config.model, hardware_driver()?)
                .with_timeout(config.timeout);
            Ok(ReadingProvider::hardware(sensor))
        }
    }
}

#[cfg(all(feature = "gpio", target_os = "linux"))]
fn hardware_driver() -> Result<Arc<dyn SensorDriver>> {
    Ok(Arc::new(microblog_sensor::gpio::GpioDriver::new()?))
}

#[cfg(not(all(feature = "gpio", target_os = "linux")))]
fn hardware_driver() -> Result<Arc<dyn SensorDriver>> {
    bail!("the hardware sensor backend needs a Linux build with the `gpio` feature")
}

#[cfg(test)]
mod tests {
    use super::*;
    use microblog_db::Database;
    use microblog_sensor::{ReadingSource, SensorModel};
    use std::time::Duration;

    fn setup() -> (Database, PasswordHasher) {
        (
            Database::open_in_memory().unwrap(),
            PasswordHasher::with_params(1024, 1, 1).unwrap(),
        )
    }

    #[test]
    fn register_then_login() {
        let (db, hasher) = setup();
        let account = register(&db, &hasher, "alice", "alice@example.com", "pw1").unwrap();

        assert_eq!(login(&db, "alice", "pw1").unwrap().id, account.id);
        assert!(login(&db, "alice", "pw1x").is_err());
        assert!(login(&db, "nobody", "pw1").is_err());
    }

    #[test]
    fn padded_username_matches_registration() {
        let (db, hasher) = setup();
        register(&db, &hasher, " alice ", "alice@example.com", "pw").unwrap();

        assert!(login(&db, " alice ", "pw").is_ok());
        assert!(login(&db, "alice", "pw").is_ok());
        post(&db, " alice ", "padded").unwrap();
        let (total, _) = posts(&db, "alice", PostQuery::default()).unwrap();
        assert_eq!(total, 1);
    }

    #[test]
    fn duplicate_registration_fails() {
        let (db, hasher) = setup();
        register(&db, &hasher, "alice", "alice@example.com", "pw").unwrap();
        let err = register(&db, &hasher, "alice", "other@example.com", "pw").unwrap_err();
        assert_eq!(err.to_string(), "username is already taken");
    }

    #[test]
    fn change_password_replaces_credential() {
        let (db, hasher) = setup();
        register(&db, &hasher, "alice", "alice@example.com", "old").unwrap();
        change_password(&db, &hasher, "alice", "new").unwrap();

        assert!(login(&db, "alice", "old").is_err());
        assert!(login(&db, "alice", "new").is_ok());
    }

    #[test]
    fn whoami_resolves_subjects() {
        let (db, hasher) = setup();
        let account = register(&db, &hasher, "alice", "alice@example.com", "pw").unwrap();

        let subject = account.id.unwrap().to_string();
        assert_eq!(whoami(&db, &subject).unwrap().unwrap().username, "alice");
        assert!(whoami(&db, "garbage").unwrap().is_none());
    }

    #[test]
    fn post_and_list() {
        let (db, hasher) = setup();
        register(&db, &hasher, "alice", "alice@example.com", "pw").unwrap();

        post(&db, "alice", "first").unwrap();
        post(&db, "alice", "second").unwrap();
        assert!(post(&db, "alice", &"x".repeat(141)).is_err());
        assert!(post(&db, "nobody", "hi").is_err());

        let (total, page) = posts(&db, "alice", PostQuery::new(1, 0)).unwrap();
        assert_eq!(total, 2);
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].body, "second");
    }

    #[test]
    fn delete_account_removes_posts() {
        let (db, hasher) = setup();
        let account = register(&db, &hasher, "alice", "alice@example.com", "pw").unwrap();
        post(&db, "alice", "bye").unwrap();

        delete_account(&db, "alice").unwrap();
        assert!(db.find_account_by_username("alice").unwrap().is_none());
        assert_eq!(db.count_posts_for(account.id.unwrap()).unwrap(), 0);
        assert!(delete_account(&db, "alice").is_err());
    }

    fn sensor_config(backend: SensorBackend) -> SensorConfig {
        SensorConfig {
            backend,
            pin: 4,
            model: SensorModel::Dht11,
            timeout: Duration::from_millis(100),
        }
    }

    #[test]
    fn simulated_provider_from_config() {
        let provider = build_provider(&sensor_config(SensorBackend::Simulated)).unwrap();
        assert_eq!(provider.backend(), SensorBackend::Simulated);
        assert!(provider.get_reading().is_ok());
    }

    #[cfg(not(feature = "gpio"))]
    #[test]
    fn hardware_provider_needs_gpio_feature() {
        assert!(build_provider(&sensor_config(SensorBackend::Hardware)).is_err());
    }
}
