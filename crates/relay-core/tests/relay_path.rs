use bytes::Bytes;
use serde_json::json;

use sfu_relay_core::packet::rtcp::{parse_compound_headers, DlrrSubBlock, RtcpPacketType};
use sfu_relay_core::prelude::*;
use sfu_relay_core::{
    remap_header_extensions, ConsumeRequest, DelaySinceLastRrBlock, NtpTimestamp, RtcpReportBlock,
    RtcpSdesChunk, RtcpSenderReport,
};

fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

#[test]
fn test_forward_packet_into_consumer_id_space() {
    init_test_logging();

    let request: ConsumeRequest = serde_json::from_value(json!({
        "consumerRtpMapping": {
            "codecs": [{ "payloadType": 111, "mappedPayloadType": 109 }],
            "headerExtensions": [
                { "id": 1, "mappedId": 3 },
                { "id": 3, "mappedId": 5 },
                { "id": 5, "mappedId": 1 }
            ]
        }
    }))
    .unwrap();
    let mapping = ConsumerRtpMapping::from_request(&request);

    // Producer packet as received from the wire
    let mut incoming = RtpPacket::new_with_payload(111, 500, 48_000, 0x1234, Bytes::from_static(b"opus frame"));
    incoming.extensions_mut().set(1, Bytes::from_static(b"mid0"));
    incoming.extensions_mut().set(3, Bytes::from_static(&[0x00, 0x2A]));
    incoming.extensions_mut().set(5, Bytes::from_static(&[0x7F]));
    let wire = incoming.serialize().unwrap();

    let mut packet = RtpPacket::parse(&wire).unwrap();
    mapping.map_packet(&mut packet);

    let forwarded = RtpPacket::parse(&packet.serialize().unwrap()).unwrap();
    assert_eq!(forwarded.payload_type(), 109);
    assert_eq!(forwarded.extensions().get(3).unwrap().as_ref(), b"mid0");
    assert_eq!(forwarded.extensions().get(5).unwrap().as_ref(), &[0x00, 0x2A]);
    assert_eq!(forwarded.extensions().get(1).unwrap().as_ref(), &[0x7F]);
    assert_eq!(forwarded.payload.as_ref(), b"opus frame");

    // Undo the extension mapping, as done for packets relayed back toward
    // the producer's id space
    let mut restored = forwarded.clone();
    remap_header_extensions(&mut restored, &mapping, true);
    for id in [1u8, 3, 5] {
        assert_eq!(restored.extensions().get(id), incoming.extensions().get(id));
    }
}

#[test]
fn test_invalid_loose_mapping_aborts_consumer_creation() {
    let err = ConsumerRtpMapping::from_value(&json!({
        "codecs": [{ "payloadType": 100, "mappedPayloadType": 96 }],
        "headerExtensions": [{ "mappedId": 2 }]
    }))
    .unwrap_err();

    assert_eq!(err, Error::InvalidMapping("missing headerExtensions[0].id".to_string()));
}

#[test]
fn test_rtcp_interval_spills_into_new_compound_packets() {
    init_test_logging();

    let config: RtcpConfig = serde_json::from_value(json!({ "mtu": 600 })).unwrap();
    config.validate().unwrap();
    let max_size = config.max_compound_size();

    let consumers: Vec<(RtcpSenderReport, RtcpSdesChunk, DelaySinceLastRrBlock)> = (0..40u32)
        .map(|ssrc| {
            let report = RtcpSenderReport::new(ssrc, NtpTimestamp::from_u64(u64::from(ssrc) << 32), ssrc * 960);
            let chunk = RtcpSdesChunk::with_cname(ssrc, &format!("consumer-{}", ssrc)).unwrap();
            let mut dlrr = DelaySinceLastRrBlock::new();
            dlrr.add_sub_block(DlrrSubBlock {
                ssrc,
                last_rr: 0,
                delay_since_last_rr: 0,
            });
            (report, chunk, dlrr)
        })
        .collect();

    let mut datagrams = Vec::new();
    let mut packet = CompoundPacket::new(&config);

    for (report, chunk, dlrr) in &consumers {
        if !packet.add_consumer_reports(report, chunk, Some(dlrr)) {
            datagrams.push(packet.serialize().unwrap());
            packet = CompoundPacket::new(&config);
            assert!(packet.add_consumer_reports(report, chunk, Some(dlrr)));
        }
    }
    if !packet.is_empty() {
        datagrams.push(packet.serialize().unwrap());
    }

    assert!(datagrams.len() > 1);

    let mut sender_reports = 0;
    for datagram in &datagrams {
        assert!(datagram.len() <= max_size);

        let headers = parse_compound_headers(datagram).unwrap();
        assert_eq!(headers[0].packet_type, RtcpPacketType::SenderReport);
        assert_eq!(headers.last().unwrap().packet_type, RtcpPacketType::ExtendedReport);
        sender_reports += headers
            .iter()
            .filter(|header| header.packet_type == RtcpPacketType::SenderReport)
            .count();
    }
    assert_eq!(sender_reports, consumers.len());
}

#[test]
fn test_producer_feedback_packet() {
    let mut packet = CompoundPacket::default();
    packet.set_receiver_report_ssrc(1);
    packet.set_extended_report_ssrc(1);

    let blocks: Vec<_> = (10..13).map(RtcpReportBlock::new).collect();
    let rrt = sfu_relay_core::ReceiverReferenceTimeBlock::new(NtpTimestamp::now());

    assert!(!packet.has_receiver_reference_time());
    assert!(packet.add_producer_reports(&blocks, Some(&rrt)));
    assert!(packet.has_receiver_reference_time());
    assert!(!packet.has_sender_report());

    let size = packet.size();
    let mut buf = vec![0u8; size];
    assert_eq!(packet.serialize_into(&mut buf).unwrap(), size);

    let headers = parse_compound_headers(&buf).unwrap();
    assert_eq!(headers.len(), 2);
    assert_eq!(headers[0].packet_type, RtcpPacketType::ReceiverReport);
    assert_eq!(headers[0].count, 3);
    assert_eq!(headers[1].packet_type, RtcpPacketType::ExtendedReport);
}
