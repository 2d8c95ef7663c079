// Unit tests for the PCM/base64 codec helpers
//
// These cover the round-trip and normalization contracts the live audio
// pipeline depends on.

use arealine_voice::audio::codec::{
    decode_base64, encode_base64, frame_to_transport, pcm16_to_audio_buffer,
    transport_to_audio_buffer, CodecError,
};

#[test]
fn test_base64_round_trip() {
    let cases: Vec<Vec<u8>> = vec![
        vec![],
        vec![0],
        vec![0xFF],
        vec![0x00, 0x80, 0x7F, 0xFF],
        (0..=255).collect(),
        vec![0xAB; 4097], // larger than one frame
    ];

    for bytes in cases {
        let encoded = encode_base64(&bytes);
        let decoded = decode_base64(&encoded).unwrap();
        assert_eq!(decoded, bytes);
    }
}

#[test]
fn test_decode_rejects_malformed_base64() {
    let err = decode_base64("not base64!!").unwrap_err();
    assert!(matches!(err, CodecError::Decode(_)));
}

#[test]
fn test_pcm16_normalization() {
    // int16 values -32768 and 0, little-endian
    let bytes = [0x00, 0x80, 0x00, 0x00];
    let buffer = pcm16_to_audio_buffer(&bytes, 24000, 1).unwrap();

    assert_eq!(buffer.channels.len(), 1);
    assert_eq!(buffer.channels[0], vec![-1.0, 0.0]);
    assert_eq!(buffer.sample_rate, 24000);
}

#[test]
fn test_pcm16_deinterleaves_stereo() {
    // Two frames of [left, right]: (1, -1), (2, -2)
    let mut bytes = Vec::new();
    for sample in [1i16, -1, 2, -2] {
        bytes.extend_from_slice(&sample.to_le_bytes());
    }

    let buffer = pcm16_to_audio_buffer(&bytes, 24000, 2).unwrap();

    assert_eq!(buffer.channels.len(), 2);
    assert_eq!(buffer.frame_count(), 2);
    assert!((buffer.channels[0][0] - 1.0 / 32768.0).abs() < 1e-9);
    assert!((buffer.channels[1][0] + 1.0 / 32768.0).abs() < 1e-9);
}

#[test]
fn test_pcm16_rejects_ragged_byte_length() {
    // 3 bytes cannot hold whole mono i16 frames
    let err = pcm16_to_audio_buffer(&[0, 0, 0], 24000, 1).unwrap_err();
    assert!(matches!(err, CodecError::Format { .. }));

    // 6 bytes is 3 samples: not a whole number of stereo frames
    let err = pcm16_to_audio_buffer(&[0; 6], 24000, 2).unwrap_err();
    assert!(matches!(err, CodecError::Format { .. }));
}

#[test]
fn test_transport_frame_mime_tag() {
    let frame = frame_to_transport(&[0.0, 0.5], 16000);
    assert_eq!(frame.mime_type, "audio/pcm;rate=16000");
}

#[test]
fn test_capture_to_playback_round_trip() {
    // Samples survive encode -> transport -> decode within i16 resolution
    let samples = vec![0.0f32, 0.25, -0.25, 0.9, -0.9];
    let transport = frame_to_transport(&samples, 16000);
    let buffer = transport_to_audio_buffer(&transport, 16000, 1).unwrap();

    assert_eq!(buffer.frame_count(), samples.len());
    for (original, decoded) in samples.iter().zip(&buffer.channels[0]) {
        assert!(
            (original - decoded).abs() < 1.0 / 32768.0 + 1e-6,
            "sample {} decoded as {}",
            original,
            decoded
        );
    }
}

#[test]
fn test_buffer_duration() {
    let bytes = vec![0u8; 48000]; // 24000 mono samples
    let buffer = pcm16_to_audio_buffer(&bytes, 24000, 1).unwrap();
    assert!((buffer.duration_secs() - 1.0).abs() < 1e-9);
}
