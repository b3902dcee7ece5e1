//! Builds one cache of each kind and shows eviction and persistence.
//!
//! Run with: `RUST_LOG=carbonite=debug cargo run --example basic_factory`

use carbonite::prelude::*;
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Thumbnail {
    width: u32,
    height: u32,
    bytes: Vec<u8>,
}

impl Cacheable for Thumbnail {}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let factory = CacheFactory::new();

    let sessions = CacheBuilder::<String>::memory()
        .with_capacity(2)
        .build(&factory)?;
    sessions.put("alice".into(), "token-a".into())?;
    sessions.put("bob".into(), "token-b".into())?;
    sessions.get(&"alice".into())?;
    if let Some(evicted) = sessions.put("carol".into(), "token-c".into())? {
        println!("memory cache evicted {evicted}");
    }

    let base = tempfile::tempdir()?;
    let builder = CacheBuilder::<Thumbnail>::storage(FixedDirectory::new(base.path()))
        .with_capacity(8);
    println!(
        "thumbnails live in {}",
        factory
            .storage_directory::<Thumbnail>(&FixedDirectory::new(base.path()))?
            .display()
    );

    {
        let thumbnails = builder.build(&factory)?;
        thumbnails.put(
            "cover.png".into(),
            Thumbnail {
                width: 64,
                height: 64,
                bytes: vec![0u8; 64],
            },
        )?;
    }

    let reopened = builder.build(&factory)?;
    let cover = reopened.get(&"cover.png".into())?;
    println!("after reopen: {cover:?}");
    Ok(())
}
