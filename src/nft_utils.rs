// src/nft_utils.rs
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NftAttribute {
    pub trait_type: String,
    /// String or number, as marketplaces return either
    pub value: Value,
}

/// NFT listing as returned by the public marketplace endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicNft {
    pub mint: String,
    pub name: String,
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub collection: String,
    pub creator: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Vec<NftAttribute>>,
}

/// Case-insensitive search over name, collection and description.
/// A blank query returns the list unchanged.
pub fn search_nfts(nfts: &[PublicNft], query: &str) -> Vec<PublicNft> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return nfts.to_vec();
    }

    nfts.iter()
        .filter(|nft| {
            nft.name.to_lowercase().contains(&query)
                || nft.collection.to_lowercase().contains(&query)
                || nft
                    .description
                    .as_deref()
                    .map(|d| d.to_lowercase().contains(&query))
                    .unwrap_or(false)
        })
        .cloned()
        .collect()
}

/// Keep NFTs whose collection contains `collection` ("all" keeps everything)
pub fn filter_by_collection(nfts: &[PublicNft], collection: &str) -> Vec<PublicNft> {
    if collection == "all" {
        return nfts.to_vec();
    }

    let needle = collection.to_lowercase();
    nfts.iter()
        .filter(|nft| nft.collection.to_lowercase().contains(&needle))
        .cloned()
        .collect()
}

/// Collection names in first-seen order
pub fn unique_collections(nfts: &[PublicNft]) -> Vec<String> {
    let mut seen = HashSet::new();
    nfts.iter()
        .filter(|nft| seen.insert(nft.collection.as_str()))
        .map(|nft| nft.collection.clone())
        .collect()
}
