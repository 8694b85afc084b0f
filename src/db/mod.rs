use anyhow::{bail, Result};
use rocksdb::{Direction, IteratorMode, Options, DB};

use crate::model::{device::Device, recommendation::Recommendation, user::User};

use std::str;

const SCHEMA_VERSION_KEY: &str = "schema:version";
const SCHEMA_VERSION: u32 = 1;

pub struct DBLayer {
    db: DB,
}

impl DBLayer {
    pub fn new(path: &str) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        let db = DB::open(&opts, path)?;

        let layer = Self { db };
        layer.ensure_schema()?;
        Ok(layer)
    }

    // ============================================================
    // SCHEMA VERSION
    // ============================================================
    fn ensure_schema(&self) -> Result<()> {
        let stored = match self.db.get(SCHEMA_VERSION_KEY)? {
            Some(raw) => str::from_utf8(&raw)?.parse::<u32>()?,
            None => {
                // Fresh database, stamp the current version.
                self.db.put(SCHEMA_VERSION_KEY, SCHEMA_VERSION.to_string())?;
                return Ok(());
            }
        };

        if stored > SCHEMA_VERSION {
            bail!("database schema v{stored} is newer than this build (v{SCHEMA_VERSION})");
        }

        for version in stored..SCHEMA_VERSION {
            self.migrate_from(version)?;
        }

        if stored < SCHEMA_VERSION {
            self.db.put(SCHEMA_VERSION_KEY, SCHEMA_VERSION.to_string())?;
        }

        Ok(())
    }

    fn migrate_from(&self, version: u32) -> Result<()> {
        match version {
            // v1 is the first persisted shape. Additive field changes ride on
            // serde defaults; structural rewrites get an arm here.
            _ => Ok(()),
        }
    }

    pub fn schema_version(&self) -> Result<u32> {
        match self.db.get(SCHEMA_VERSION_KEY)? {
            Some(raw) => Ok(str::from_utf8(&raw)?.parse()?),
            None => bail!("schema version missing"),
        }
    }

    // ============================================================
    // KEYS
    // ============================================================
    // Records are keyed under a zero-padded per-user sequence so prefix
    // iteration yields insertion order.
    fn device_key(user_id: &str, seq: u64, device_id: &str) -> String {
        format!("device:{user_id}:{seq:010}:{device_id}")
    }

    fn device_prefix(user_id: &str) -> String {
        format!("device:{user_id}:")
    }

    fn rec_key(user_id: &str, seq: u64, rec_id: &str) -> String {
        format!("rec:{user_id}:{seq:010}:{rec_id}")
    }

    fn rec_prefix(user_id: &str) -> String {
        format!("rec:{user_id}:")
    }

    fn user_key(user_id: &str) -> String {
        format!("user:{user_id}")
    }

    fn email_lookup_key(email: &str) -> String {
        format!("user_email:{email}")
    }

    fn external_lookup_key(external_id: &str) -> String {
        format!("user_ext:{external_id}")
    }

    fn next_seq(&self, counter_key: &str) -> Result<u64> {
        let current = match self.db.get(counter_key)? {
            Some(raw) => str::from_utf8(&raw)?.parse::<u64>()?,
            None => 0,
        };
        let next = current + 1;
        self.db.put(counter_key, next.to_string())?;
        Ok(next)
    }

    // ============================================================
    // DEVICE STORAGE (INSERTION-ORDERED)
    // ============================================================
    pub async fn append_device(&self, device: &Device) -> Result<()> {
        let seq = self.next_seq(&format!("device_seq:{}", device.user_id))?;
        let key = Self::device_key(&device.user_id, seq, &device.id);
        self.db.put(key, serde_json::to_vec(device)?)?;
        Ok(())
    }

    fn find_device_entry(&self, user_id: &str, device_id: &str) -> Result<Option<(Vec<u8>, Device)>> {
        let prefix = Self::device_prefix(user_id);
        for item in self
            .db
            .iterator(IteratorMode::From(prefix.as_bytes(), Direction::Forward))
        {
            let (key, val) = item?;
            let k = str::from_utf8(&key)?;
            if !k.starts_with(&prefix) {
                break;
            }

            let device: Device = serde_json::from_slice(&val)?;
            if device.id == device_id {
                return Ok(Some((key.to_vec(), device)));
            }
        }
        Ok(None)
    }

    pub async fn load_device(&self, user_id: &str, device_id: &str) -> Result<Option<Device>> {
        Ok(self
            .find_device_entry(user_id, device_id)?
            .map(|(_, device)| device))
    }

    /// Rewrite an existing record in place, keeping its position in the
    /// insertion order. Returns false if the id is unknown.
    pub async fn save_device(&self, device: &Device) -> Result<bool> {
        if let Some((key, _)) = self.find_device_entry(&device.user_id, &device.id)? {
            self.db.put(key, serde_json::to_vec(device)?)?;
            return Ok(true);
        }
        Ok(false)
    }

    pub async fn delete_device(&self, user_id: &str, device_id: &str) -> Result<bool> {
        if let Some((key, _)) = self.find_device_entry(user_id, device_id)? {
            self.db.delete(key)?;
            return Ok(true);
        }
        Ok(false)
    }

    pub async fn list_devices(&self, user_id: &str) -> Result<Vec<Device>> {
        let prefix = Self::device_prefix(user_id);
        let mut results = Vec::new();

        for item in self
            .db
            .iterator(IteratorMode::From(prefix.as_bytes(), Direction::Forward))
        {
            let (key, val) = item?;
            let k = str::from_utf8(&key)?;
            if !k.starts_with(&prefix) {
                break;
            }

            results.push(serde_json::from_slice(&val)?);
        }

        Ok(results)
    }

    // ============================================================
    // RECOMMENDATION STORAGE (INSERTION-ORDERED)
    // ============================================================
    pub async fn append_recommendation(&self, rec: &Recommendation) -> Result<()> {
        let seq = self.next_seq(&format!("rec_seq:{}", rec.user_id))?;
        let key = Self::rec_key(&rec.user_id, seq, &rec.id);
        self.db.put(key, serde_json::to_vec(rec)?)?;
        Ok(())
    }

    fn find_rec_entry(&self, user_id: &str, rec_id: &str) -> Result<Option<(Vec<u8>, Recommendation)>> {
        let prefix = Self::rec_prefix(user_id);
        for item in self
            .db
            .iterator(IteratorMode::From(prefix.as_bytes(), Direction::Forward))
        {
            let (key, val) = item?;
            let k = str::from_utf8(&key)?;
            if !k.starts_with(&prefix) {
                break;
            }

            let rec: Recommendation = serde_json::from_slice(&val)?;
            if rec.id == rec_id {
                return Ok(Some((key.to_vec(), rec)));
            }
        }
        Ok(None)
    }

    pub async fn load_recommendation(&self, user_id: &str, rec_id: &str) -> Result<Option<Recommendation>> {
        Ok(self.find_rec_entry(user_id, rec_id)?.map(|(_, rec)| rec))
    }

    pub async fn save_recommendation(&self, rec: &Recommendation) -> Result<bool> {
        if let Some((key, _)) = self.find_rec_entry(&rec.user_id, &rec.id)? {
            self.db.put(key, serde_json::to_vec(rec)?)?;
            return Ok(true);
        }
        Ok(false)
    }

    pub async fn list_recommendations(&self, user_id: &str) -> Result<Vec<Recommendation>> {
        let prefix = Self::rec_prefix(user_id);
        let mut results = Vec::new();

        for item in self
            .db
            .iterator(IteratorMode::From(prefix.as_bytes(), Direction::Forward))
        {
            let (key, val) = item?;
            let k = str::from_utf8(&key)?;
            if !k.starts_with(&prefix) {
                break;
            }

            results.push(serde_json::from_slice(&val)?);
        }

        Ok(results)
    }

    // ============================================================
    // USER STORAGE
    // ============================================================
    pub async fn save_user(&self, user: &User) -> Result<()> {
        self.db
            .put(Self::user_key(&user.id), serde_json::to_vec(user)?)?;

        // fast lookups: email → user, provider subject → user
        if let Some(email) = &user.email {
            self.db.put(Self::email_lookup_key(email), user.id.as_bytes())?;
        }
        if let Some(external_id) = &user.external_id {
            self.db
                .put(Self::external_lookup_key(external_id), user.id.as_bytes())?;
        }

        Ok(())
    }

    pub async fn load_user(&self, user_id: &str) -> Result<Option<User>> {
        Ok(self
            .db
            .get(Self::user_key(user_id))?
            .map(|v| serde_json::from_slice(&v))
            .transpose()?)
    }

    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let id = match self.db.get(Self::email_lookup_key(email))? {
            Some(raw) => str::from_utf8(&raw)?.to_string(),
            None => return Ok(None),
        };
        self.load_user(&id).await
    }

    pub async fn find_user_by_external_id(&self, external_id: &str) -> Result<Option<User>> {
        let id = match self.db.get(Self::external_lookup_key(external_id))? {
            Some(raw) => str::from_utf8(&raw)?.to_string(),
            None => return Ok(None),
        };
        self.load_user(&id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::device::{DeviceAdvice, DeviceCategory, DeviceCondition};
    use crate::model::recommendation::{RecommendationAction, Urgency};
    use crate::model::user::Preferences;
    use tempfile::TempDir;

    fn open_db(dir: &TempDir) -> DBLayer {
        DBLayer::new(dir.path().to_str().unwrap()).unwrap()
    }

    fn device(id: &str, user_id: &str) -> Device {
        Device {
            id: id.to_string(),
            user_id: user_id.to_string(),
            name: format!("Test {id}"),
            brand: "Test".into(),
            model: id.to_string(),
            category: DeviceCategory::Phone,
            purchase_ts: 0,
            purchase_price: 100.0,
            current_value: 90.0,
            condition: DeviceCondition::Good,
            notes: None,
            image_url: None,
            price_history: Vec::new(),
            advice: DeviceAdvice {
                action: RecommendationAction::DontSell,
                reason: "hold".into(),
                confidence: 75,
                urgency: Urgency::Low,
                market_insights: Vec::new(),
            },
            created_ts: 0,
            updated_ts: 0,
        }
    }

    #[tokio::test]
    async fn devices_list_in_insertion_order() {
        let dir = TempDir::new().unwrap();
        let db = open_db(&dir);

        for id in ["zeta", "alpha", "mike"] {
            db.append_device(&device(id, "u1")).await.unwrap();
        }

        let listed = db.list_devices("u1").await.unwrap();
        let ids: Vec<_> = listed.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["zeta", "alpha", "mike"]);
    }

    #[tokio::test]
    async fn save_keeps_insertion_position() {
        let dir = TempDir::new().unwrap();
        let db = open_db(&dir);

        db.append_device(&device("a", "u1")).await.unwrap();
        db.append_device(&device("b", "u1")).await.unwrap();

        let mut first = db.load_device("u1", "a").await.unwrap().unwrap();
        first.notes = Some("edited".into());
        assert!(db.save_device(&first).await.unwrap());

        let ids: Vec<_> = db
            .list_devices("u1")
            .await
            .unwrap()
            .iter()
            .map(|d| d.id.clone())
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn delete_is_scoped_to_user() {
        let dir = TempDir::new().unwrap();
        let db = open_db(&dir);

        db.append_device(&device("a", "u1")).await.unwrap();
        db.append_device(&device("a", "u2")).await.unwrap();

        assert!(db.delete_device("u1", "a").await.unwrap());
        assert!(!db.delete_device("u1", "a").await.unwrap());
        assert!(db.load_device("u2", "a").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn user_lookup_by_email_and_subject() {
        let dir = TempDir::new().unwrap();
        let db = open_db(&dir);

        let user = User {
            id: "u1".into(),
            name: Some("Alex".into()),
            email: Some("alex@example.com".into()),
            avatar_url: None,
            external_id: Some("google:123".into()),
            created_ts: 1,
            updated_ts: 1,
            password_hash: None,
            preferences: Preferences::default(),
            meta: None,
        };
        db.save_user(&user).await.unwrap();

        assert_eq!(
            db.find_user_by_email("alex@example.com")
                .await
                .unwrap()
                .unwrap()
                .id,
            "u1"
        );
        assert_eq!(
            db.find_user_by_external_id("google:123")
                .await
                .unwrap()
                .unwrap()
                .id,
            "u1"
        );
        assert!(db.find_user_by_email("nope@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn fresh_database_is_stamped_with_current_schema() {
        let dir = TempDir::new().unwrap();
        let db = open_db(&dir);
        assert_eq!(db.schema_version().unwrap(), SCHEMA_VERSION);
    }
}
