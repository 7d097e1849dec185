use mongodb::bson::{doc, Document};
use mongodb::options::IndexOptions;
use mongodb::{Client, Collection, Database, IndexModel};
use std::error::Error;

// Nomes das collections
pub const COMPANIES: &str = "companies";
pub const DEPARTMENTS: &str = "departments";
pub const POSITIONS: &str = "positions";
pub const ROLES: &str = "roles";
pub const USERS: &str = "users";
pub const ORGANIZATIONAL_UNITS: &str = "organizational_units";
pub const TRANSPORTATION_REQUESTS: &str = "transportation_requests";
pub const MEETING_REQUESTS: &str = "meeting_requests";
pub const FACILITY_REQUESTS: &str = "facility_requests";
pub const VOUCHERS: &str = "vouchers";
pub const DEVICES: &str = "devices";
pub const SETTINGS: &str = "settings";
pub const SYNC_HISTORY: &str = "sync_history";
pub const WEBHOOK_EVENTS: &str = "webhook_events";
pub const APPROVAL_WORKFLOWS: &str = "approval_workflows";
pub const MEETING_ROOMS: &str = "meeting_rooms";
pub const LOCATIONS: &str = "locations";
pub const VEHICLES: &str = "vehicles";
pub const DRIVERS: &str = "drivers";
pub const TRANSPORT_COMPANIES: &str = "transport_companies";
pub const TRIP_PURPOSES: &str = "trip_purposes";
pub const TRIP_EVENTS: &str = "trip_events";

#[derive(Clone)]
pub struct MongoDB {
    client: Client,
    db: Database,
}

impl MongoDB {
    pub async fn new(uri: &str, db_name: &str) -> Result<Self, Box<dyn Error>> {
        let mut client_options = mongodb::options::ClientOptions::parse(uri).await?;

        // Connection pool
        client_options.max_pool_size = Some(20);
        client_options.min_pool_size = Some(5);
        client_options.max_idle_time = Some(std::time::Duration::from_secs(300));

        client_options.connect_timeout = Some(std::time::Duration::from_secs(5));
        client_options.server_selection_timeout = Some(std::time::Duration::from_secs(5));

        let client = Client::with_options(client_options)?;

        // O nome do banco no URI tem prioridade sobre MONGODB_DB
        let db_name = database_name_from_uri(uri).unwrap_or_else(|| db_name.to_string());
        let db = client.database(&db_name);

        // Test connection
        db.run_command(doc! { "ping": 1 }).await?;

        let mongodb = Self { client, db };
        mongodb.ensure_indexes().await?;

        Ok(mongodb)
    }

    /// Creates the indexes the services rely on (unique business keys + list filters)
    async fn ensure_indexes(&self) -> Result<(), Box<dyn Error>> {
        log::info!("🔧 Creating database indexes...");

        let unique = [
            (COMPANIES, doc! { "companyId": 1 }),
            (DEPARTMENTS, doc! { "departmentId": 1 }),
            (POSITIONS, doc! { "positionId": 1 }),
            (ROLES, doc! { "roleId": 1 }),
            (USERS, doc! { "userId": 1 }),
            (VOUCHERS, doc! { "voucherCode": 1 }),
            (DEVICES, doc! { "deviceId": 1 }),
            (SETTINGS, doc! { "key": 1 }),
            (ORGANIZATIONAL_UNITS, doc! { "scimId": 1 }),
            (TRANSPORTATION_REQUESTS, doc! { "requestNumber": 1 }),
            (MEETING_REQUESTS, doc! { "requestNumber": 1 }),
            (FACILITY_REQUESTS, doc! { "requestNumber": 1 }),
            (MEETING_ROOMS, doc! { "roomId": 1 }),
            (LOCATIONS, doc! { "locationId": 1 }),
            (VEHICLES, doc! { "vehicleId": 1 }),
            (DRIVERS, doc! { "driverId": 1 }),
            (TRANSPORT_COMPANIES, doc! { "companyId": 1 }),
            (TRIP_PURPOSES, doc! { "companyId": 1, "purposeId": 1 }),
            (TRIP_EVENTS, doc! { "requestId": 1, "eventType": 1 }),
        ];

        for (collection, keys) in unique {
            let index = IndexModel::builder()
                .keys(keys.clone())
                .options(IndexOptions::builder().unique(true).build())
                .build();
            self.create_index(collection, index, &keys).await;
        }

        let sparse_unique = [(USERS, doc! { "ssoUserId": 1 })];
        for (collection, keys) in sparse_unique {
            let index = IndexModel::builder()
                .keys(keys.clone())
                .options(IndexOptions::builder().unique(true).sparse(true).build())
                .build();
            self.create_index(collection, index, &keys).await;
        }

        let plain = [
            (USERS, doc! { "email": 1 }),
            (USERS, doc! { "companyId": 1, "isActive": 1 }),
            (TRANSPORTATION_REQUESTS, doc! { "userId": 1, "createdAt": -1 }),
            (TRANSPORTATION_REQUESTS, doc! { "status": 1, "scheduledTime": 1 }),
            (MEETING_REQUESTS, doc! { "roomId": 1, "startTime": 1 }),
            (MEETING_REQUESTS, doc! { "userId": 1 }),
            (FACILITY_REQUESTS, doc! { "userId": 1, "createdAt": -1 }),
            (VOUCHERS, doc! { "companyId": 1, "status": 1 }),
            (SYNC_HISTORY, doc! { "completedAt": -1 }),
            (WEBHOOK_EVENTS, doc! { "receivedAt": -1 }),
            (DRIVERS, doc! { "userId": 1 }),
            (TRANSPORTATION_REQUESTS, doc! { "driverId": 1, "scheduledTime": 1 }),
        ];

        for (collection, keys) in plain {
            let index = IndexModel::builder().keys(keys.clone()).build();
            self.create_index(collection, index, &keys).await;
        }

        log::info!("✅ Database indexes ready");

        Ok(())
    }

    async fn create_index(&self, collection: &str, index: IndexModel, keys: &Document) {
        let coll = self.db.collection::<Document>(collection);
        let fields: Vec<&str> = keys.keys().map(String::as_str).collect();

        match coll.create_index(index).await {
            Ok(_) => log::info!("   ✅ Index created: {}({})", collection, fields.join(", ")),
            Err(e) => log::debug!("   ℹ️  Index already exists: {}", e),
        }
    }

    /// Cliente sem ping nem índices: para testes de rota que não chegam ao banco
    #[cfg(test)]
    pub async fn unconnected() -> Self {
        let client = Client::with_uri_str("mongodb://127.0.0.1:1").await.expect("valid test uri");
        let db = client.database("ofm_unconnected");
        Self { client, db }
    }

    pub async fn ping(&self) -> bool {
        self.db.run_command(doc! { "ping": 1 }).await.is_ok()
    }

    pub fn collection<T: Send + Sync>(&self, name: &str) -> Collection<T> {
        self.db.collection(name)
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn client(&self) -> &Client {
        &self.client
    }
}

/// Extract database name from URI path (`mongodb://host/ofm?x=y` -> `ofm`)
fn database_name_from_uri(uri: &str) -> Option<String> {
    let without_scheme = uri.split_once("://").map(|(_, rest)| rest).unwrap_or(uri);
    let (_, path) = without_scheme.split_once('/')?;
    let name = path.split('?').next().unwrap_or("");
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_name_from_uri() {
        assert_eq!(database_name_from_uri("mongodb://localhost:27017/ofm"), Some("ofm".into()));
        assert_eq!(
            database_name_from_uri("mongodb+srv://u:p@cluster.net/ofm_prod?retryWrites=true"),
            Some("ofm_prod".into())
        );
        assert_eq!(database_name_from_uri("mongodb://localhost:27017"), None);
        assert_eq!(database_name_from_uri("mongodb://localhost:27017/?tls=true"), None);
    }

    #[tokio::test]
    #[ignore]
    async fn test_connect_and_ping() {
        let db = MongoDB::new("mongodb://localhost:27017", "ofm_test").await.unwrap();
        assert!(db.ping().await);
    }
}
