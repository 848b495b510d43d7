//! Decompression bomb protection
//!
//! Inflation is capped at the declared decoded size; a stream that would
//! produce more fails instead of growing without bound.

mod common;

use common::*;
use fusion_archive::{decode, Chunk, ErrorKind};

#[test]
fn test_legitimate_highly_compressible_data() {
    println!("\n💣 Testing legitimate highly compressible data (10MB zeros)...");

    let plain = vec![0u8; 10 * 1024 * 1024];
    let body = mode1(&plain);
    let data = GameBuilder::new().chunk(0x2238, 1, &body).build();

    let ratio = plain.len() as f64 / body.len() as f64;
    println!("  Original size: {} MB", plain.len() / 1024 / 1024);
    println!("  Compressed body: {} KB", body.len() / 1024);
    println!("  Compression ratio: {:.1}x", ratio);
    assert!(body.len() < 100 * 1024, "Body should compress to < 100KB");

    let game = decode(&data).unwrap();
    let decoded = game.chunks()[0].entry().decode_body(game.modes()).unwrap();
    assert_eq!(decoded.len(), plain.len());
    assert!(decoded.as_bytes().iter().all(|&b| b == 0));

    println!("  ✅ Legitimate highly compressible data handled correctly");
}

#[test]
fn test_understated_decoded_size_is_rejected() {
    println!("\n💣 Testing stream larger than its declared size...");

    let plain = vec![0u8; 10 * 1024 * 1024];
    let mut body = mode1(&plain);
    body[0..4].copy_from_slice(&1024u32.to_le_bytes());
    let data = GameBuilder::new().chunk(0x2238, 1, &body).build();

    // Bodies are decoded lazily, so the archive itself loads.
    let game = decode(&data).unwrap();
    let err = game.chunks()[0]
        .entry()
        .decode_body(game.modes())
        .unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::InflateFailed);
    assert!(err.mentions("expected 1024 bytes"));

    println!("  ✅ Oversized stream rejected: {}", err.trace()[0]);
}

#[test]
fn test_overstated_decoded_size_is_rejected() {
    println!("\n💣 Testing a tiny stream claiming 4GB...");

    let plain = b"tiny".to_vec();
    let mut body = mode1(&plain);
    body[0..4].copy_from_slice(&u32::MAX.to_le_bytes());
    let data = GameBuilder::new().chunk(0x2238, 1, &body).build();

    let game = decode(&data).unwrap();
    let err = game.chunks()[0]
        .entry()
        .decode_body(game.modes())
        .unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::InflateFailed);

    println!("  ✅ Overstated size rejected without allocating it");
}

#[test]
fn test_bomb_inside_bank_item() {
    println!("\n💣 Testing bomb inside an image item...");

    let mut record = 1u32.to_le_bytes().to_vec();
    let plain = vec![0u8; 4 * 1024 * 1024];
    let mut body = mode1(&plain);
    body[0..4].copy_from_slice(&64u32.to_le_bytes());
    record.extend_from_slice(&body);

    let data = GameBuilder::new()
        .chunk(0x6666, 0, &bank_body(&[record]))
        .build();
    let game = decode(&data).unwrap();

    let Chunk::ImageBank(bank) = &game.chunks()[0] else {
        panic!("expected image bank");
    };
    // Reading the item never inflates it; asking for the header does.
    assert_eq!(bank.items.len(), 1);
    let err = bank.items[0].header(game.modes()).unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::InflateFailed);

    println!("  ✅ Item bomb detected on first decode");
}

#[test]
fn test_huge_item_count_is_not_preallocated() {
    println!("\n💣 Testing bank declaring 4 billion items...");

    let mut body = u32::MAX.to_le_bytes().to_vec();
    body.extend_from_slice(&image_record(1, 1, 1, &[0; 4]));
    let data = GameBuilder::new().chunk(0x6666, 0, &body).build();

    let err = decode(&data).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::OutOfData { .. }));
    assert!(err.mentions("Failed To Read Image Bank"));

    println!("  ✅ Item count bounded by available data");
}
