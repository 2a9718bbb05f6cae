use std::borrow::Cow;

use serde::Deserialize;

/*
{
    "success": true,
    "start": 0,
    "pagesize": 100,
    "total_count": 21190,
    "searchdata": { ... },
    "results": [
        {
            "name": "Danger Zone Case",
            "hash_name": "Danger Zone Case",
            "sell_listings": 112854,
            "sell_price": 74,
            "sell_price_text": "$0.74",
            "app_icon": "https://cdn.fastly.steamstatic.com/steamcommunity/public/images/apps/730/...jpg",
            "app_name": "Counter-Strike 2",
            "asset_description": {
                "appid": 730,
                "classid": "3035569977",
                "instanceid": "0",
                "background_color": "",
                "icon_url": "-9a81dlWLwJ2UUGcVs_nsVtzdOEdtWwKGZZLQHTxDZ7I56KU0Zwwo4NUX4oFJZEHLbXH5A...",
                "tradable": 1,
                "name": "Danger Zone Case",
                "name_color": "D2D2D2",
                "type": "Base Grade Container",
                "market_name": "Danger Zone Case",
                "market_hash_name": "Danger Zone Case",
                "commodity": 1
            },
            "sale_price_text": "$0.71"
        }
    ]
}
*/
#[derive(Debug, PartialEq, Deserialize)]
pub struct SearchPage {
    pub success: bool,
    #[serde(default)]
    pub total_count: usize,
    #[serde(default)]
    pub results: Vec<Listing>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Listing {
    pub hash_name: String,
    /// In the smallest unit of the currency, e.g. cents
    pub sell_price: i64,
    #[serde(default)]
    pub asset_description: serde_json::Map<String, serde_json::Value>,

    #[serde(flatten)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

impl Listing {
    /// Looks up an optional field, preferring the top-level value over the one in the asset
    /// description. `null` counts as missing.
    ///
    /// `hash_name` and `sell_price` are parsed into their own fields, so they are answered from
    /// those.
    pub fn field(&self, name: &str) -> Option<Cow<'_, serde_json::Value>> {
        match name {
            "hash_name" => return Some(Cow::Owned(self.hash_name.clone().into())),
            "sell_price" => return Some(Cow::Owned(self.sell_price.into())),
            _ => {}
        };

        let present = |value: &&serde_json::Value| !value.is_null();

        self.fields
            .get(name)
            .filter(present)
            .or_else(|| self.asset_description.get(name).filter(present))
            .map(Cow::Borrowed)
    }
}
