use rand::rngs::StdRng;
use rand::SeedableRng;
use voicelink_core::{
    decode_packet, encode_packet, simulate_channel, transmit_with_rng, Decoder, Encoder,
    Features, LinkError, PacketHeader, QuantizedFeatures, TemplateLibrary, UNKNOWN_COMMAND,
};

fn reference_header() -> PacketHeader {
    PacketHeader {
        version: 1,
        msg_type: 0,
        seq: 1,
        cmd_id: 0,
        n_frames: 2,
        dim: 3,
        scale_q: 100,
    }
}

fn reference_payload() -> QuantizedFeatures {
    QuantizedFeatures::from_rows(vec![vec![1, -2, 3], vec![4, -5, 6]]).unwrap()
}

/// Synthetic "utterance": a smooth 13-dim trajectory, stretched in time
fn utterance(frames: usize, pitch: f32, level: f32) -> Features {
    Features::from_rows(
        (0..frames)
            .map(|i| {
                let t = i as f32 / frames as f32;
                (0..13)
                    .map(|k| level + ((k as f32 + 1.0) * pitch * t).sin())
                    .collect()
            })
            .collect(),
    )
    .unwrap()
}

fn command_library() -> TemplateLibrary {
    let mut library = TemplateLibrary::new();
    library.insert("on", utterance(40, 3.0, 0.0));
    library.insert("off", utterance(45, 6.0, -1.0));
    library.insert("up", utterance(38, 1.5, 1.0));
    library.insert("down", utterance(50, 9.0, 0.5));
    library.insert("on", utterance(44, 3.2, 0.1));
    library
}

#[test]
fn test_clean_packet_round_trip() {
    let encoded = encode_packet(&reference_header(), &reference_payload()).unwrap();
    assert_eq!(encoded.len(), 12 + 6 + 2);

    let (header, payload) = decode_packet(&encoded).expect("Failed to decode");
    assert_eq!(header, reference_header());
    assert_eq!(payload, reference_payload());
}

#[test]
fn test_heavy_noise_breaks_crc() {
    let encoded = encode_packet(&reference_header(), &reference_payload()).unwrap();
    let mut rng = StdRng::seed_from_u64(2024);

    // At -5 dB the magic is usually hit first, so CRC rejections are rare
    // (under 0.1% of packets) but must still occur.
    let mut crc_failures = 0;
    let mut other_failures = 0;
    for _ in 0..50_000 {
        let received = transmit_with_rng(&encoded, -5.0, &mut rng);
        assert_eq!(received.len(), encoded.len());
        match decode_packet(&received) {
            Err(LinkError::CrcMismatch { .. }) => crc_failures += 1,
            Err(_) => other_failures += 1,
            Ok(_) => {}
        }
    }

    println!("-5 dB: {} CRC failures, {} other", crc_failures, other_failures);
    assert!(crc_failures > 0, "Noise model never produced a CRC rejection");
    assert!(other_failures > crc_failures);
}

#[test]
fn test_high_snr_channel_is_transparent() {
    let encoded = encode_packet(&reference_header(), &reference_payload()).unwrap();
    for _ in 0..100 {
        let received = simulate_channel(&encoded, 30.0);
        assert_eq!(received, encoded);
        assert!(decode_packet(&received).is_ok());
    }
}

#[test]
fn test_end_to_end_recognition_over_channel() {
    let encoder = Encoder::default();
    let decoder = Decoder::with_templates(command_library());
    let mut rng = StdRng::seed_from_u64(7);

    let spoken = [
        ("on", utterance(42, 3.1, 0.05)),
        ("off", utterance(47, 6.1, -1.0)),
        ("up", utterance(36, 1.5, 1.05)),
        ("down", utterance(52, 8.8, 0.5)),
    ];

    for (seq, (expected, features)) in spoken.iter().enumerate() {
        let packet = encoder.encode(features, seq as u16, 0).unwrap();
        let received = transmit_with_rng(&packet, 12.0, &mut rng);
        let reception = decoder.decode(&received).expect("Failed to decode at 12 dB");

        assert_eq!(reception.header.seq, seq as u16);
        assert_eq!(&reception.recognition.command, expected);
        assert!(reception.recognition.distance.is_finite());
    }
}

#[test]
fn test_empty_library_yields_unknown() {
    let decoder = Decoder::with_templates(TemplateLibrary::new());
    let packet = Encoder::default()
        .encode(&utterance(30, 2.0, 0.0), 9, 0)
        .unwrap();
    let reception = decoder.decode(&packet).unwrap();
    assert_eq!(reception.recognition.command, UNKNOWN_COMMAND);
    assert_eq!(reception.recognition.distance, f64::INFINITY);
}

#[test]
fn test_failed_decode_yields_no_command() {
    let decoder = Decoder::with_templates(command_library());
    let mut packet = Encoder::default()
        .encode(&utterance(40, 3.0, 0.0), 1, 0)
        .unwrap();
    packet[20] ^= 0x04;
    assert!(matches!(
        decoder.decode(&packet),
        Err(LinkError::CrcMismatch { .. })
    ));
}
