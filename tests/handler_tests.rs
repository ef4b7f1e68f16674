mod common;

use std::sync::Arc;

use common::{CaptureWriter, StaticHandler, TestDirectory, ZONE, client_addr};
use svcdns::dns::enums::{RecordType, ResponseCode};
use svcdns::dns::record::RData;
use svcdns::dns::{Message, record::Record};
use svcdns::traits::Handler;
use svcdns::{Config, Engine, Request};

fn config() -> Config {
    Config {
        zones: vec![ZONE.to_string()],
        ..Default::default()
    }
}

fn engine() -> Engine {
    Engine::new(config(), Arc::new(TestDirectory::new())).unwrap()
}

fn request(name: &str, qtype: RecordType) -> Request {
    Request::new(Message::query(name, qtype), client_addr())
}

#[tokio::test]
async fn a_query_for_cluster_ip_service() {
    let mut writer = CaptureWriter::new();
    let rcode = engine()
        .serve(&request("web.default.svc.cluster.local.", RecordType::A), &mut writer)
        .await
        .unwrap();

    assert_eq!(rcode, ResponseCode::NoError);
    let reply = writer.last();
    assert!(reply.header.response);
    assert!(reply.header.authoritative);
    assert!(reply.compress);
    // the two per-port records are identical A records, so dedup leaves one
    assert_eq!(
        reply.answers,
        vec![Record::new(
            "web.default.svc.cluster.local.",
            5,
            RData::A("10.1.0.10".parse().unwrap())
        )]
    );
}

#[tokio::test]
async fn a_query_for_headless_service_returns_every_endpoint() {
    let mut writer = CaptureWriter::new();
    engine()
        .serve(&request("hdls.default.svc.cluster.local.", RecordType::A), &mut writer)
        .await
        .unwrap();

    let mut addrs: Vec<String> = writer
        .last()
        .answers
        .iter()
        .map(|r| match &r.rdata {
            RData::A(ip) => ip.to_string(),
            other => panic!("unexpected rdata {other:?}"),
        })
        .collect();
    addrs.sort();
    assert_eq!(addrs, vec!["172.16.0.2", "172.16.0.3"]);
}

#[tokio::test]
async fn unknown_name_gets_authoritative_nxdomain() {
    let mut writer = CaptureWriter::new();
    let rcode = engine()
        .serve(&request("nope.default.svc.cluster.local.", RecordType::A), &mut writer)
        .await
        .unwrap();

    assert_eq!(rcode, ResponseCode::NameError);
    let reply = writer.last();
    assert_eq!(reply.header.rcode, ResponseCode::NameError);
    assert!(reply.answers.is_empty());
    assert_eq!(reply.authorities.len(), 1);
    assert_eq!(reply.authorities[0].rtype(), RecordType::SOA);
}

#[tokio::test]
async fn existing_name_with_wrong_type_gets_nodata() {
    let mut writer = CaptureWriter::new();
    let rcode = engine()
        .serve(&request("web.default.svc.cluster.local.", RecordType::MX), &mut writer)
        .await
        .unwrap();

    assert_eq!(rcode, ResponseCode::NoError);
    let reply = writer.last();
    assert_eq!(reply.header.rcode, ResponseCode::NoError);
    assert!(reply.answers.is_empty());
    assert_eq!(reply.authorities[0].rtype(), RecordType::SOA);
}

#[tokio::test]
async fn unsupported_type_probes_existence() {
    let mut writer = CaptureWriter::new();
    // HINFO: not produced by the directory, but the name exists
    let rcode = engine()
        .serve(
            &request("web.default.svc.cluster.local.", RecordType::Unknown(13)),
            &mut writer,
        )
        .await
        .unwrap();
    assert_eq!(rcode, ResponseCode::NoError);
    assert!(writer.last().answers.is_empty());

    let mut writer = CaptureWriter::new();
    let rcode = engine()
        .serve(
            &request("missing.default.svc.cluster.local.", RecordType::Unknown(13)),
            &mut writer,
        )
        .await
        .unwrap();
    assert_eq!(rcode, ResponseCode::NameError);
}

#[tokio::test]
async fn unmatched_zone_passes_through_to_fallback() {
    let fallback = Arc::new(StaticHandler::answering(vec![Record::new(
        "www.example.org.",
        300,
        RData::A("192.0.2.14".parse().unwrap()),
    )]));
    let engine = engine().with_fallback(fallback.clone());

    let mut writer = CaptureWriter::new();
    let rcode = engine
        .serve(&request("www.example.org.", RecordType::A), &mut writer)
        .await
        .unwrap();

    assert_eq!(rcode, ResponseCode::NoError);
    assert_eq!(fallback.calls(), 1);
    assert_eq!(writer.last().answers.len(), 1);
}

#[tokio::test]
async fn unmatched_zone_without_fallback_is_a_server_failure() {
    let mut writer = CaptureWriter::new();
    let err = engine()
        .serve(&request("www.example.org.", RecordType::A), &mut writer)
        .await
        .unwrap_err();
    assert!(matches!(err, svcdns::EngineError::NoFallback));
    assert!(writer.written.is_empty());
}

#[tokio::test]
async fn fallthrough_delegates_missing_names() {
    let fallback = Arc::new(StaticHandler::answering(Vec::new()));
    let config = Config {
        fallthrough: true,
        ..config()
    };
    let engine = Engine::new(config, Arc::new(TestDirectory::new()))
        .unwrap()
        .with_fallback(fallback.clone());

    let mut writer = CaptureWriter::new();
    engine
        .serve(&request("nope.default.svc.cluster.local.", RecordType::A), &mut writer)
        .await
        .unwrap();
    assert_eq!(fallback.calls(), 1);
}

#[tokio::test]
async fn unsynced_directory_refuses_queries() {
    let engine = Engine::new(config(), Arc::new(TestDirectory { synced: false })).unwrap();
    let mut writer = CaptureWriter::new();
    let err = engine
        .serve(&request("web.default.svc.cluster.local.", RecordType::A), &mut writer)
        .await
        .unwrap_err();
    assert!(matches!(err, svcdns::EngineError::Directory(_)));
}

#[tokio::test]
async fn missing_question_is_an_invalid_query() {
    let mut writer = CaptureWriter::new();
    let err = engine()
        .serve(&Request::new(Message::default(), client_addr()), &mut writer)
        .await
        .unwrap_err();
    assert!(matches!(err, svcdns::EngineError::InvalidQuery(_)));
}

#[tokio::test]
async fn soa_query_carries_the_directory_serial() {
    let mut writer = CaptureWriter::new();
    engine()
        .serve(&request(ZONE, RecordType::SOA), &mut writer)
        .await
        .unwrap();

    match &writer.last().answers[0].rdata {
        RData::Soa { serial, mname, .. } => {
            assert_eq!(*serial, 2025);
            assert_eq!(mname, "ns.dns.cluster.local.");
        }
        other => panic!("unexpected rdata {other:?}"),
    }
}

#[tokio::test]
async fn ns_query_at_the_apex_answers_the_zone_ns_set() {
    let mut writer = CaptureWriter::new();
    engine()
        .serve(&request(ZONE, RecordType::NS), &mut writer)
        .await
        .unwrap();

    let reply = writer.last();
    assert_eq!(reply.answers.len(), 1);
    assert_eq!(
        reply.answers[0].rdata,
        RData::Ns("ns.dns.cluster.local.".to_string())
    );
}

#[tokio::test]
async fn srv_query_puts_glue_in_extras() {
    let mut writer = CaptureWriter::new();
    engine()
        .serve(&request("hdls.default.svc.cluster.local.", RecordType::SRV), &mut writer)
        .await
        .unwrap();

    let reply = writer.last();
    assert_eq!(reply.answers.len(), 2);
    assert_eq!(reply.extras.len(), 2);
    for record in &reply.answers {
        assert_eq!(record.rtype(), RecordType::SRV);
    }
    for record in &reply.extras {
        assert_eq!(record.rtype(), RecordType::A);
    }
}

#[tokio::test]
async fn ptr_query_over_a_reverse_zone() {
    let config = Config {
        zones: vec![ZONE.to_string(), "10.in-addr.arpa.".to_string()],
        ..Default::default()
    };
    let engine = Engine::new(config, Arc::new(TestDirectory::new())).unwrap();

    let mut writer = CaptureWriter::new();
    engine
        .serve(&request("10.0.1.10.in-addr.arpa.", RecordType::PTR), &mut writer)
        .await
        .unwrap();

    assert_eq!(
        writer.last().answers[0].rdata,
        RData::Ptr("web.default.svc.cluster.local.".to_string())
    );
}

#[tokio::test]
async fn external_name_service_answers_cname_on_a_query() {
    let mut writer = CaptureWriter::new();
    engine()
        .serve(&request("ext.default.svc.cluster.local.", RecordType::A), &mut writer)
        .await
        .unwrap();

    assert_eq!(
        writer.last().answers,
        vec![Record::new(
            "ext.default.svc.cluster.local.",
            5,
            RData::Cname("example.net.".to_string())
        )]
    );
}

#[tokio::test]
async fn reply_echoes_the_request_edns_budget() {
    let mut msg = Message::query("web.default.svc.cluster.local.", RecordType::A);
    msg.edns_udp_size = Some(1232);
    let mut writer = CaptureWriter::new();
    engine()
        .serve(&Request::new(msg, client_addr()), &mut writer)
        .await
        .unwrap();
    assert_eq!(writer.last().edns_udp_size, Some(1232));
}
