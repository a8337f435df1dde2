//! Codec Tests
//!
//! Tests for frame encoding, status decoding and stream helpers.

use std::collections::{HashSet, VecDeque};
use std::io::{self, Read, Write};

use tesmart::protocol::{
    decode, encode, encode_command, encode_status, template, write_frame, Command, Frame,
    FrameReader, Opcode, ReadOutcome, FRAME_LEN, STATUS_TEMPLATE,
};
use tesmart::SwitchError;

// =============================================================================
// Command Encoding Tests
// =============================================================================

#[test]
fn test_encode_command_wire_table() {
    let cases: [(Command, [u8; 6]); 7] = [
        (Command::SwitchInput { index: 2 }, [0xAA, 0xBB, 0x03, 0x01, 0x02, 0xEE]),
        (Command::SetLedTimeout { seconds: 10 }, [0xAA, 0xBB, 0x03, 0x03, 0x0A, 0xEE]),
        (Command::MuteBuzzer, [0xAA, 0xBB, 0x03, 0x02, 0x00, 0xEE]),
        (Command::UnmuteBuzzer, [0xAA, 0xBB, 0x03, 0x02, 0x01, 0xEE]),
        (Command::EnableAutoInputDetection, [0xAA, 0xBB, 0x03, 0x81, 0x01, 0xEE]),
        (Command::DisableAutoInputDetection, [0xAA, 0xBB, 0x03, 0x81, 0x00, 0xEE]),
        (Command::GetCurrentInput, [0xAA, 0xBB, 0x03, 0x10, 0x00, 0xEE]),
    ];

    for (command, expected) in cases {
        assert_eq!(encode_command(&command).as_bytes(), &expected, "{:?}", command);
    }
}

#[test]
fn test_encode_only_touches_param_byte() {
    let base = template(Opcode::SwitchInput);
    let frame = encode(&base, 0x7F);

    assert_eq!(frame.as_bytes()[..4], base[..4]);
    assert_eq!(frame.param(), 0x7F);
    assert_eq!(frame.as_bytes()[5], 0xEE);
}

#[test]
fn test_encode_is_injective_in_value() {
    let opcodes = [
        Opcode::SwitchInput,
        Opcode::Buzzer,
        Opcode::LedTimeout,
        Opcode::GetCurrentInput,
        Opcode::AutoInputDetection,
    ];

    for opcode in opcodes {
        let frames: HashSet<Frame> = (0..=u8::MAX).map(|v| encode(&template(opcode), v)).collect();
        assert_eq!(frames.len(), 256, "{:?}", opcode);
    }
}

#[test]
fn test_only_queries_expect_a_response() {
    assert!(Command::SwitchInput { index: 0 }.expects_response());
    assert!(Command::GetCurrentInput.expects_response());

    assert!(!Command::SetLedTimeout { seconds: 0 }.expects_response());
    assert!(!Command::MuteBuzzer.expects_response());
    assert!(!Command::UnmuteBuzzer.expects_response());
    assert!(!Command::EnableAutoInputDetection.expects_response());
    assert!(!Command::DisableAutoInputDetection.expects_response());
}

// =============================================================================
// Status Decoding Tests
// =============================================================================

#[test]
fn test_decode_reference_reply() {
    let reply = [0xAA, 0xBB, 0x03, 0x11, 0x02, 0x18];
    assert_eq!(decode(&reply).unwrap(), 3);
}

#[test]
fn test_status_round_trip() {
    for index in 0..u8::MAX {
        let frame = encode_status(index);
        assert_eq!(decode(frame.as_bytes()).unwrap(), index + 1);
    }
}

#[test]
fn test_decode_check_byte_wraps() {
    // 0xF0 + 0x16 overflows to 0x06
    let reply = [0xAA, 0xBB, 0x03, 0x11, 0xF0, 0x06];
    assert_eq!(decode(&reply).unwrap(), 0xF1);
}

#[test]
fn test_decode_rejects_index_without_one_based_value() {
    let frame = encode_status(0xFF);
    assert!(matches!(
        decode(frame.as_bytes()),
        Err(SwitchError::InvalidResponse(_))
    ));
}

#[test]
fn test_decode_rejects_check_byte_mismatch() {
    let reply = [0xAA, 0xBB, 0x03, 0x11, 0x02, 0x19];
    assert!(matches!(decode(&reply), Err(SwitchError::InvalidResponse(_))));
}

#[test]
fn test_decode_rejects_bad_prefix_with_valid_check_byte() {
    let valid = *encode_status(4).as_bytes();

    for position in 0..4 {
        let mut mutated = valid;
        mutated[position] ^= 0x40;
        assert!(
            matches!(decode(&mutated), Err(SwitchError::InvalidResponse(_))),
            "byte {} mutated",
            position
        );
    }
}

#[test]
fn test_decode_rejects_command_frames() {
    // A command echoed back is not a status frame
    let echoed = encode_command(&Command::SwitchInput { index: 2 });
    assert!(decode(echoed.as_bytes()).is_err());
}

#[test]
fn test_decode_rejects_wrong_length() {
    let short = [0xAA, 0xBB, 0x03, 0x11, 0x02];
    let long = [0xAA, 0xBB, 0x03, 0x11, 0x02, 0x18, 0xEE];

    assert!(decode(&short).is_err());
    assert!(decode(&long).is_err());
    assert!(decode(&[]).is_err());
}

#[test]
fn test_status_template_is_index_zero() {
    assert_eq!(decode(&STATUS_TEMPLATE).unwrap(), 1);
}

// =============================================================================
// Frame Tests
// =============================================================================

#[test]
fn test_frame_display_is_spaced_hex() {
    let frame = encode_command(&Command::SwitchInput { index: 2 });
    assert_eq!(frame.to_string(), "AA BB 03 01 02 EE");
    assert_eq!(format!("{:?}", frame), "Frame[AA BB 03 01 02 EE]");
}

#[test]
fn test_frame_from_slice_checks_length() {
    assert!(Frame::from_slice(&[0xAA, 0xBB, 0x03, 0x11, 0x02, 0x18]).is_ok());
    assert!(Frame::from_slice(&[0xAA, 0xBB]).is_err());
}

// =============================================================================
// Stream Helper Tests
// =============================================================================

/// Replays scripted read results, then reports EOF
struct ScriptedReader {
    script: VecDeque<io::Result<Vec<u8>>>,
}

impl ScriptedReader {
    fn new(script: Vec<io::Result<Vec<u8>>>) -> Self {
        Self {
            script: script.into(),
        }
    }
}

impl Read for ScriptedReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.script.pop_front() {
            None => Ok(0),
            Some(Err(e)) => Err(e),
            Some(Ok(bytes)) => {
                assert!(bytes.len() <= buf.len());
                buf[..bytes.len()].copy_from_slice(&bytes);
                Ok(bytes.len())
            }
        }
    }
}

fn deadline() -> io::Error {
    io::Error::new(io::ErrorKind::WouldBlock, "deadline")
}

#[test]
fn test_frame_reader_keeps_partial_frame_across_deadline() {
    let mut reader = FrameReader::new(ScriptedReader::new(vec![
        Ok(vec![0xAA, 0xBB, 0x03]),
        Err(deadline()),
        Ok(vec![0x11, 0x02, 0x18, 0xAA, 0xBB, 0x03, 0x11, 0x03, 0x19]),
    ]));

    assert_eq!(reader.read_frame().unwrap(), ReadOutcome::Idle);
    assert_eq!(reader.buffered(), 3);

    assert_eq!(
        reader.read_frame().unwrap(),
        ReadOutcome::Frame(encode_status(2))
    );
    assert_eq!(
        reader.read_frame().unwrap(),
        ReadOutcome::Frame(encode_status(3))
    );
    assert_eq!(reader.read_frame().unwrap(), ReadOutcome::Closed);
}

#[test]
fn test_frame_reader_skips_junk_before_and_between_frames() {
    let mut reader = FrameReader::new(ScriptedReader::new(vec![Ok(vec![
        0x00, 0xEE, // noise
        0xAA, 0xBB, 0x03, 0x11, 0x02, 0x18, // status
        0xEE, 0x55, // trailing sentinel, noise
        0xAA, 0x00, // marker that doesn't continue
        0xAA, 0xBB, 0x03, 0x11, 0x03, 0x19, // status
    ])]));

    assert_eq!(
        reader.read_frame().unwrap(),
        ReadOutcome::Frame(encode_status(2))
    );
    assert_eq!(
        reader.read_frame().unwrap(),
        ReadOutcome::Frame(encode_status(3))
    );
    assert_eq!(reader.read_frame().unwrap(), ReadOutcome::Closed);
}

#[test]
fn test_frame_reader_keeps_lone_marker_byte_across_deadline() {
    let mut reader = FrameReader::new(ScriptedReader::new(vec![
        Ok(vec![0xEE, 0xAA]),
        Err(deadline()),
        Ok(vec![0xBB, 0x03, 0x11, 0x04, 0x1A]),
    ]));

    assert_eq!(reader.read_frame().unwrap(), ReadOutcome::Idle);
    assert_eq!(reader.buffered(), 1);

    assert_eq!(
        reader.read_frame().unwrap(),
        ReadOutcome::Frame(encode_status(4))
    );
}

#[test]
fn test_frame_reader_drops_pure_noise() {
    let mut reader = FrameReader::new(ScriptedReader::new(vec![
        Ok(vec![0x01, 0x02, 0x03, 0xEE, 0xEE, 0xEE, 0xEE]),
        Err(deadline()),
    ]));

    assert_eq!(reader.read_frame().unwrap(), ReadOutcome::Idle);
    assert_eq!(reader.buffered(), 0);
}

#[test]
fn test_frame_reader_treats_timed_out_as_idle() {
    let mut reader = FrameReader::new(ScriptedReader::new(vec![Err(io::Error::new(
        io::ErrorKind::TimedOut,
        "deadline",
    ))]));

    assert_eq!(reader.read_frame().unwrap(), ReadOutcome::Idle);
}

#[test]
fn test_frame_reader_surfaces_hard_errors() {
    let mut reader = FrameReader::new(ScriptedReader::new(vec![Err(io::Error::new(
        io::ErrorKind::ConnectionReset,
        "reset",
    ))]));

    let err = reader.read_frame().unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::ConnectionReset);
}

#[test]
fn test_frame_reader_retries_interrupted() {
    let mut reader = FrameReader::new(ScriptedReader::new(vec![
        Err(io::Error::new(io::ErrorKind::Interrupted, "signal")),
        Ok(encode_status(7).as_bytes().to_vec()),
    ]));

    assert_eq!(
        reader.read_frame().unwrap(),
        ReadOutcome::Frame(encode_status(7))
    );
}

/// Accepts at most `limit` bytes per write
struct LimitedWriter {
    limit: usize,
    written: Vec<u8>,
}

impl Write for LimitedWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = buf.len().min(self.limit);
        self.written.extend_from_slice(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn test_write_frame_writes_all_six_bytes() {
    let mut writer = LimitedWriter {
        limit: 64,
        written: Vec::new(),
    };
    let frame = encode_command(&Command::MuteBuzzer);

    write_frame(&mut writer, &frame).unwrap();

    assert_eq!(writer.written, frame.as_bytes().to_vec());
}

#[test]
fn test_write_frame_reports_short_write() {
    let mut writer = LimitedWriter {
        limit: 4,
        written: Vec::new(),
    };
    let frame = encode_command(&Command::MuteBuzzer);

    match write_frame(&mut writer, &frame) {
        Err(SwitchError::ShortWrite { written, expected }) => {
            assert_eq!(written, 4);
            assert_eq!(expected, FRAME_LEN);
        }
        other => panic!("Expected ShortWrite, got {:?}", other),
    }
}
