//! SMBIOS system UUID byte-order correction
//!
//! XCP-ng's UEFI firmware publishes SMBIOS 2.8 tables but writes the system
//! UUID in big-endian order. Linux decodes the first three fields as
//! little-endian, as SMBIOS 2.8 mandates, so the UUID a node reports in
//! `status.nodeInfo.systemUUID` has those fields byte-reversed relative to
//! the VM id in Xen Orchestra.

use uuid::Uuid;

/// Swap the byte order of the first three UUID fields (4, 2 and 2 bytes)
///
/// The trailing 8 bytes are untouched. Applying this twice yields the input,
/// so callers must track whether a value has already been converted.
pub fn swap_smbios_uuid(reported: Uuid) -> Uuid {
    Uuid::from_bytes(reported.to_bytes_le())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uuid(s: &str) -> Uuid {
        Uuid::parse_str(s).unwrap()
    }

    #[test]
    fn swaps_leading_fields() {
        let cases = [
            (
                "59aee6ae-f0b8-a2bd-a89d-55638d1e9725",
                "aee6ae59-b8f0-bda2-a89d-55638d1e9725",
            ),
            (
                "6c0bc35f-7e48-34fe-04c3-67812e3b17a7",
                "5fc30b6c-487e-fe34-04c3-67812e3b17a7",
            ),
            (
                "77f4080b-1a49-82a9-23c4-d224723624ea",
                "0b08f477-491a-a982-23c4-d224723624ea",
            ),
            (
                "6a87cb0f-ca4c-ffa5-3ca2-fc398fb25eac",
                "0fcb876a-4cca-a5ff-3ca2-fc398fb25eac",
            ),
        ];

        for (reported, actual) in cases {
            assert_eq!(swap_smbios_uuid(uuid(reported)), uuid(actual), "{reported}");
        }
    }

    #[test]
    fn zero_and_all_ones_are_fixed_points() {
        assert_eq!(swap_smbios_uuid(Uuid::nil()), Uuid::nil());
        let ones = Uuid::from_bytes([0xff; 16]);
        assert_eq!(swap_smbios_uuid(ones), ones);
    }

    #[test]
    fn swapping_twice_restores_input() {
        for s in [
            "59aee6ae-f0b8-a2bd-a89d-55638d1e9725",
            "550e8400-e29b-41d4-a716-446655440001",
        ] {
            let u = uuid(s);
            assert_ne!(swap_smbios_uuid(u), u);
            assert_eq!(swap_smbios_uuid(swap_smbios_uuid(u)), u);
        }
    }
}
