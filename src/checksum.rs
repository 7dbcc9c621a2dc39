use crate::protocol::Direction;

/// XOR of every byte in `data`.
pub fn xor_reduce(data: &[u8]) -> u8 {
    data.iter().fold(0, |acc, b| acc ^ b)
}

/// First index covered by the checksum of a frame travelling in `direction`.
///
/// Inbound frames skip the two marker bytes, outbound frames fold in their own
/// start byte.
pub const fn coverage_start(direction: Direction) -> usize {
    match direction {
        Direction::Inbound => 2,
        Direction::Outbound => 0,
    }
}

/// Checksum for `frame`, which holds everything up to but excluding the
/// checksum byte.
pub fn compute(direction: Direction, frame: &[u8]) -> u8 {
    let start = coverage_start(direction).min(frame.len());
    xor_reduce(&frame[start..])
}

/// A complete candidate is accepted iff its trailing byte equals the checksum
/// of the bytes before it. Candidates that are too short to carry a header
/// never validate.
pub fn is_valid(direction: Direction, frame: &[u8]) -> bool {
    let min = coverage_start(direction) + 3;
    match frame.split_last() {
        Some((found, body)) if frame.len() >= min => compute(direction, body) == *found,
        _ => false,
    }
}

/// Returns the (calculated, found) pair for a complete candidate.
pub fn pair(direction: Direction, frame: &[u8]) -> Option<(u8, u8)> {
    let (found, body) = frame.split_last()?;
    Some((compute(direction, body), *found))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TELEMETRY: [u8; 30] = [
        0x5C, 0x00, 0x19, 0x62, 0x18, 0x96, 0x00, 0xE1, 0x01, 0x02, 0x00, 0x00, 0x00, 0x00, 0x80,
        0x00, 0x00, 0x00, 0x00, 0x00, 0x02, 0x09, 0x14, 0x34, 0x00, 0x01, 0x00, 0x00, 0x05, 0xB8,
    ];

    #[test]
    fn inbound_excludes_marker() {
        assert!(is_valid(Direction::Inbound, &TELEMETRY));
        assert_eq!(compute(Direction::Inbound, &TELEMETRY[..29]), 0xB8);
        // write poll token
        assert!(is_valid(Direction::Inbound, &[0x5C, 0x00, 0x20, 0x6B, 0x00, 0x4B]));
    }

    #[test]
    fn outbound_includes_start_byte() {
        let read_req = [0xC0, 0x69, 0x02, 0x39, 0x9C, 0x0E];
        assert!(is_valid(Direction::Outbound, &read_req));
        // the same bytes do not validate under the inbound rule
        assert!(!is_valid(Direction::Inbound, &read_req));
    }

    const READ_RESPONSE: [u8; 12] = [
        0x5C, 0x00, 0x20, 0x6A, 0x06, 0x39, 0x9C, 0x00, 0x00, 0x01, 0x2C, 0xC4,
    ];
    const WRITE_REQUEST: [u8; 10] = [0xC0, 0x6B, 0x06, 0x39, 0x9C, 0x2C, 0x01, 0x00, 0x00, 0x25];

    fn only_own_checksum_validates(direction: Direction, frame: &[u8]) {
        assert!(is_valid(direction, frame), "{:02X?}", frame);
        let mut copy = frame.to_vec();
        let last = copy.len() - 1;
        for delta in 1..=u8::MAX {
            copy[last] = frame[last] ^ delta;
            assert!(!is_valid(direction, &copy), "{:02X?}", copy);
        }
    }

    #[test]
    fn any_checksum_change_rejects() {
        let inbound: [&[u8]; 5] = [
            &TELEMETRY,
            &[0x5C, 0x00, 0x20, 0x6B, 0x00, 0x4B],
            &[0x5C, 0x00, 0x20, 0x69, 0x00, 0x49],
            &READ_RESPONSE,
            &[0x5C, 0x00, 0x20, 0x6C, 0x01, 0x01, 0x4C],
        ];
        for frame in inbound {
            only_own_checksum_validates(Direction::Inbound, frame);
        }
        let outbound: [&[u8]; 3] = [
            &[0xC0, 0x69, 0x02, 0x40, 0x9C, 0x77],
            &[0xC0, 0x69, 0x02, 0x39, 0x9C, 0x0E],
            &WRITE_REQUEST,
        ];
        for frame in outbound {
            only_own_checksum_validates(Direction::Outbound, frame);
        }
    }

    #[test]
    fn short_candidates_never_validate() {
        assert!(!is_valid(Direction::Inbound, &[]));
        assert!(!is_valid(Direction::Inbound, &[0x5C, 0x00, 0x00, 0x00]));
        assert!(!is_valid(Direction::Outbound, &[0xC0, 0xC0]));
    }

    #[test]
    fn pair_reports_both_sides() {
        assert_eq!(pair(Direction::Inbound, &TELEMETRY), Some((0xB8, 0xB8)));
        assert_eq!(pair(Direction::Outbound, &WRITE_REQUEST[..9]), Some((0x25, 0x00)));
        assert_eq!(pair(Direction::Inbound, &[]), None);
    }
}
