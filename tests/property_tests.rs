//! Property-based tests for the packet codec.

use proptest::prelude::*;
use rconsole::packet::{
    ClientPacket, ClientPacketType, Incoming, ServerPacket, PACKET_MAXIMUM_BODY_SIZE,
};

fn decode(bytes: &[u8]) -> ServerPacket {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("runtime should build");
    let mut reader = bytes;
    match runtime.block_on(ServerPacket::read_from(&mut reader)) {
        Ok(Incoming::Packet(packet)) => packet,
        other => panic!("expected a regular packet, got {other:?}"),
    }
}

// Kinds whose wire codes a server packet can also carry.
fn decodable_kind() -> impl Strategy<Value = ClientPacketType> {
    prop_oneof![
        Just(ClientPacketType::ResponseCheck),
        Just(ClientPacketType::ExecCommand),
    ]
}

// Property: any packet that fits can be encoded and read back unchanged
proptest! {
    #[test]
    fn prop_packet_roundtrip(
        id in any::<i32>(),
        kind in decodable_kind(),
        body in "[ -~]{0,4086}",
    ) {
        let packet = ClientPacket::new(id, kind, body.clone());
        let bytes = packet.pack().expect("body fits in a packet");
        let decoded = decode(&bytes);

        prop_assert_eq!(decoded.id(), id);
        prop_assert_eq!(decoded.packet_type().code(), kind.code());
        prop_assert_eq!(decoded.body().expect("ascii body"), body.as_str());
    }
}

// Property: bodies past the limit never encode
proptest! {
    #[test]
    fn prop_oversized_body_rejected(
        id in any::<i32>(),
        extra in 1usize..512,
    ) {
        let body = "x".repeat(PACKET_MAXIMUM_BODY_SIZE as usize + extra);
        let packet = ClientPacket::new(id, ClientPacketType::ExecCommand, body);
        prop_assert!(packet.pack().is_err());
    }
}

#[test]
fn boundary_ids_roundtrip() {
    for id in [i32::MIN, -1, 0, i32::MAX] {
        let packet = ClientPacket::new(id, ClientPacketType::ExecCommand, "status");
        let decoded = decode(&packet.pack().unwrap());
        assert_eq!(decoded.id(), id);
    }
}
