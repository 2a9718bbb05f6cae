use mongodb::bson::{Bson, Document};

use crate::{
    error::PersistenceError,
    steam::Listing,
    store::{ListingStore, Upsert},
    Context,
};

pub const SELL_PRICE_FIELD: &str = "sellPrice";

/// The fields stored for one listing: the sell price plus every whitelisted property the listing
/// carries. Properties the listing lacks are left out so they never overwrite stored values.
pub fn build_upsert(listing: &Listing, properties: &[String]) -> Result<Upsert, PersistenceError> {
    let mut fields = Document::new();
    fields.insert(SELL_PRICE_FIELD, Bson::Int64(listing.sell_price));

    for property in properties {
        if let Some(value) = listing.field(property) {
            fields.insert(property.clone(), mongodb::bson::to_bson(&*value)?);
        }
    }

    Ok(Upsert {
        key: listing.hash_name.clone(),
        fields,
    })
}

#[tracing::instrument(skip(ctx, listings), fields(items = listings.len()))]
pub async fn upsert_page<A, S>(ctx: &Context<A, S>, listings: &[Listing]) -> Result<(), PersistenceError>
where
    S: ListingStore,
{
    let upserts = listings
        .iter()
        .map(|listing| build_upsert(listing, &ctx.config.properties))
        .collect::<Result<Vec<_>, _>>()?;

    ctx.store.upsert_batch(upserts).await
}
