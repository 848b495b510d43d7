#![no_main]

use fusion_archive::{decode, Chunk, DecodeOptions, Decoder};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Skip inputs too small to hold an MZ header
    if data.len() < 2 {
        return;
    }

    // Strict decode - should never panic
    if let Err(err) = decode(data) {
        let _ = err.to_string();
    }

    // Lenient decode so banks with broken items still come back
    let decoder = Decoder::with_options(DecodeOptions::new().with_skip_broken_items(true));
    let game = match decoder.decode(data) {
        Ok(g) => g,
        Err(_) => return, // Expected for invalid data
    };

    // Summaries decode every text chunk - should never panic
    let _ = game.summary_json();

    // Decode every lazily stored body - should never panic
    for chunk in game.chunks() {
        let _ = chunk.entry().decode_body(game.modes());
        match chunk {
            Chunk::AppHeader(header) => {
                let _ = header.view(game.modes());
            }
            Chunk::ObjectBank(bank) => {
                for object in &bank.items {
                    let _ = object.header(&game);
                    let _ = object.name(&game);
                }
            }
            Chunk::Frame(frame) => {
                let _ = frame.name(&game);
                for child in &frame.chunks {
                    let _ = child.entry.decode_body(game.modes());
                }
            }
            Chunk::Handles(handles) => {
                let _ = handles.offsets(game.modes());
            }
            Chunk::ImageBank(bank) => {
                for image in &bank.items {
                    let _ = image.header(game.modes());
                    let _ = image.data(game.modes());
                }
            }
            Chunk::FontBank(bank) => {
                for font in &bank.items {
                    let _ = font.data(game.modes());
                }
            }
            Chunk::SoundBank(bank) => {
                for sound in &bank.items {
                    let _ = sound.decode(&game);
                }
            }
            Chunk::MusicBank(bank) => {
                for music in &bank.items {
                    let _ = music.decode(&game);
                }
            }
            _ => {}
        }
    }
});
