use super::*;

#[test]
fn test_state_cookie_roundtrip() {
    let param = Param::StateCookie(vec![1, 2, 3, 4, 5]);
    let mut out = vec![];
    param.marshal(&mut out);
    assert_eq!(out.len() % 4, 0);
    let (parsed, consumed) = Param::unmarshal(&out).unwrap();
    assert_eq!(parsed, param);
    assert_eq!(consumed, out.len());
}

#[test]
fn test_outgoing_reset_roundtrip() {
    let param = Param::OutgoingSsnResetRequest {
        request_sequence: 100,
        response_sequence: 50,
        senders_last_tsn: 0xdeadbeef,
        stream_identifiers: vec![1, 3, 5],
    };
    let mut out = vec![];
    param.marshal(&mut out);
    let (parsed, _) = Param::unmarshal(&out).unwrap();
    assert_eq!(parsed, param);
}

#[test]
fn test_reconfig_response_roundtrip() {
    let param = Param::ReconfigResponse {
        response_sequence: 7,
        result: RECONFIG_RESULT_SUCCESS_PERFORMED,
    };
    let mut out = vec![];
    param.marshal(&mut out);
    let (parsed, _) = Param::unmarshal(&out).unwrap();
    assert_eq!(parsed, param);
}

#[test]
fn test_forward_tsn_supported_is_empty_tlv() {
    let mut out = vec![];
    Param::ForwardTsnSupported.marshal(&mut out);
    assert_eq!(out, vec![0xC0, 0x00, 0x00, 0x04]);
}

#[test]
fn test_unknown_param_roundtrip() {
    let param = Param::Unknown {
        typ: 0x8123,
        value: vec![9, 9, 9],
    };
    let mut out = vec![];
    param.marshal(&mut out);
    let (parsed, consumed) = Param::unmarshal(&out).unwrap();
    assert_eq!(parsed, param);
    assert_eq!(consumed, 8);
}

#[test]
fn test_list_parsing() {
    let mut out = vec![];
    Param::ForwardTsnSupported.marshal(&mut out);
    Param::StateCookie(vec![0xAA; 7]).marshal(&mut out);
    let params = Param::unmarshal_list(&out).unwrap();
    assert_eq!(params.len(), 2);
    assert_eq!(params[0], Param::ForwardTsnSupported);
}
