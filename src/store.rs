use mongodb::bson::{doc, Bson, Document};

use crate::error::PersistenceError;

/// Overwrite `fields` on the document identified by `key`, creating it if needed
#[derive(Debug, Clone, PartialEq)]
pub struct Upsert {
    pub key: String,
    pub fields: Document,
}

#[async_trait::async_trait]
pub trait ListingStore: Send + Sync {
    /// Applies all upserts as one unordered batch
    async fn upsert_batch(&self, upserts: Vec<Upsert>) -> Result<(), PersistenceError>;
}

pub struct MongoStore {
    db: mongodb::Database,
    collection: String,
}

impl MongoStore {
    pub fn new(db: mongodb::Database, collection: impl Into<String>) -> Self {
        Self {
            db,
            collection: collection.into(),
        }
    }
}

#[async_trait::async_trait]
impl ListingStore for MongoStore {
    async fn upsert_batch(&self, upserts: Vec<Upsert>) -> Result<(), PersistenceError> {
        if upserts.is_empty() {
            return Ok(());
        }

        let total = upserts.len();
        let command = update_command(&self.collection, upserts);

        let reply = self.db.run_command(command, None).await?;
        tracing::trace!("Update reply {:?}", reply);

        check_write_errors(&reply, total)
    }
}

fn update_command(collection: &str, upserts: Vec<Upsert>) -> Document {
    let updates: Vec<Bson> = upserts
        .into_iter()
        .map(|upsert| {
            Bson::Document(doc! {
                "q": { "_id": upsert.key },
                "u": { "$set": upsert.fields },
                "upsert": true,
            })
        })
        .collect();

    doc! {
        "update": collection,
        "updates": updates,
        "ordered": false,
    }
}

fn check_write_errors(reply: &Document, total: usize) -> Result<(), PersistenceError> {
    // Reported alongside `ok: 1`, so run_command does not turn it into an error
    if let Ok(concern) = reply.get_document("writeConcernError") {
        return Err(PersistenceError::WriteConcern {
            code: concern.get_i32("code").unwrap_or_default(),
            message: concern.get_str("errmsg").unwrap_or("unknown").to_string(),
        });
    }

    let errors = match reply.get_array("writeErrors") {
        Ok(errors) if !errors.is_empty() => errors,
        _ => return Ok(()),
    };

    let first = errors
        .first()
        .and_then(Bson::as_document)
        .and_then(|err| err.get_str("errmsg").ok())
        .unwrap_or("unknown")
        .to_string();

    Err(PersistenceError::WriteErrors {
        failed: errors.len(),
        total,
        first,
    })
}
