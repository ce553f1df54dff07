//! End-to-end parser scenarios.

use std::cell::RefCell;
use std::rc::Rc;

use bytes::BytesMut;
use h1_codec::parser::{Config, HeaderLimits, RequestParser, ResponseParser};
use h1_codec::{Kind, Method, Payload, Result, Sink, Version};

// Feed a byte stream through prepare/commit/parse until it is fully
// committed, tolerating NeedData along the way.
fn feed_request(p: &mut RequestParser, mut input: &[u8]) -> Result<()> {
    loop {
        let mut buf = p.prepare();
        let n = buf.write(input);
        p.commit(n);
        input = &input[n..];
        match p.parse() {
            Ok(()) => {
                if input.is_empty() {
                    return Ok(());
                }
            }
            Err(e) if e.is_need_data() => {
                if input.is_empty() {
                    return Err(e);
                }
            }
            Err(e) => return Err(e),
        }
    }
}

fn feed_response(p: &mut ResponseParser, mut input: &[u8]) -> Result<()> {
    loop {
        let mut buf = p.prepare();
        let n = buf.write(input);
        p.commit(n);
        input = &input[n..];
        match p.parse() {
            Ok(()) => {
                if input.is_empty() {
                    return Ok(());
                }
            }
            Err(e) if e.is_need_data() => {
                if input.is_empty() {
                    return Err(e);
                }
            }
            Err(e) => return Err(e),
        }
    }
}

#[test]
fn simple_get() {
    let mut p = RequestParser::new(Config::default());
    p.start();
    feed_request(&mut p, b"GET / HTTP/1.1\r\nHost: x\r\n\r\n").unwrap();

    assert!(p.is_complete());
    let req = p.get().unwrap();
    assert_eq!(req.method(), Method::Get);
    assert_eq!(req.target(), "/");
    assert_eq!(req.version(), Version::Http11);
    assert_eq!(req.len(), 1);
    assert_eq!(req.get("Host").unwrap(), b"x");
    assert_eq!(req.metadata().payload, Payload::None);
    assert!(p.body().is_empty());
}

#[test]
fn post_with_content_length_and_leftover() {
    let mut p = RequestParser::new(Config::default());
    p.start();
    feed_request(&mut p, b"POST /p HTTP/1.1\r\nContent-Length: 4\r\n\r\nABCDxyz").unwrap();

    assert!(p.is_complete());
    assert_eq!(p.get().unwrap().metadata().payload, Payload::Size(4));
    assert_eq!(p.body(), b"ABCD");
    assert_eq!(&p.release_buffered_data()[..], b"xyz");
}

#[test]
fn chunked_response_with_trailer() {
    let wire = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n\
                 5\r\nhello\r\n1;ext=x\r\n!\r\n0\r\nTrailer-Field: z\r\n\r\n";
    let mut p = ResponseParser::new(Config::response());
    p.start();
    feed_response(&mut p, wire).unwrap();

    assert!(p.is_complete());
    assert_eq!(p.body(), b"hello!");
    let res = p.get().unwrap();
    assert_eq!(res.status_code(), 200);
    assert_eq!(res.metadata().payload, Payload::Chunked);
    assert_eq!(res.get("Trailer-Field").unwrap(), b"z");
}

#[test]
fn multiple_content_length_conflict() {
    let mut p = RequestParser::new(Config::default());
    p.start();
    let err = feed_request(
        &mut p,
        b"GET / HTTP/1.1\r\nContent-Length: 3\r\nContent-Length: 4\r\n\r\n",
    )
    .unwrap_err();
    assert_eq!(err.kind(), Kind::MultipleContentLength);
    assert!(p.is_end_of_stream());
}

#[test]
fn same_content_length_twice_is_fine() {
    let mut p = RequestParser::new(Config::default());
    p.start();
    feed_request(
        &mut p,
        b"POST / HTTP/1.1\r\nContent-Length: 5\r\nContent-Length: 5\r\n\r\nhello",
    )
    .unwrap();
    assert_eq!(p.body(), b"hello");
    assert_eq!(p.get().unwrap().metadata().content_length.value, 5);
}

#[test]
fn obs_fold_is_normalized() {
    let mut p = RequestParser::new(Config::default());
    p.start();
    feed_request(&mut p, b"GET / HTTP/1.1\r\nX: a\r\n b\r\n\r\n").unwrap();
    let req = p.get().unwrap();
    assert_eq!(req.get("X").unwrap(), b"a   b");
    assert!(!req
        .buffer()
        .windows(4)
        .take(req.buffer().len() - 4)
        .any(|w| w == b"\r\n b"));
}

#[test]
fn content_length_zero() {
    let mut p = RequestParser::new(Config::default());
    p.start();
    feed_request(&mut p, b"POST / HTTP/1.1\r\nContent-Length: 0\r\n\r\n").unwrap();
    assert!(p.is_complete());
    assert_eq!(p.get().unwrap().metadata().payload, Payload::Size(0));
    assert!(p.body().is_empty());
}

#[test]
fn incremental_feeding_matches_one_shot() {
    let wire: &[u8] = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n\
                        3\r\nfoo\r\n3\r\nbar\r\n0\r\n\r\n";

    let mut whole = ResponseParser::new(Config::response());
    whole.start();
    feed_response(&mut whole, wire).unwrap();

    let mut steps = ResponseParser::new(Config::response());
    steps.start();
    for chunk in wire.chunks(1) {
        let mut rest = chunk;
        while !rest.is_empty() {
            let mut buf = steps.prepare();
            let n = buf.write(rest);
            steps.commit(n);
            rest = &rest[n..];
        }
        match steps.parse() {
            Ok(()) => {}
            Err(e) if e.is_need_data() => {}
            Err(e) => panic!("unexpected error: {:?}", e),
        }
    }

    assert!(whole.is_complete());
    assert!(steps.is_complete());
    assert_eq!(whole.body(), steps.body());
    assert_eq!(
        whole.get().unwrap().buffer(),
        steps.get().unwrap().buffer()
    );
}

#[test]
fn read_to_eof_response() {
    let mut p = ResponseParser::new(Config::response());
    p.start();
    let err = feed_response(&mut p, b"HTTP/1.1 200 OK\r\n\r\nsome data").unwrap_err();
    assert!(err.is_need_data());
    assert_eq!(p.get().unwrap().metadata().payload, Payload::ToEof);

    p.commit_eof();
    p.parse().unwrap();
    assert!(p.is_complete());
    assert!(p.is_end_of_stream());
    assert_eq!(p.body(), b"some data");
}

#[test]
fn head_response_has_no_body() {
    let mut p = ResponseParser::new(Config::response());
    p.start_head_response();
    feed_response(&mut p, b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\n").unwrap();
    assert!(p.is_complete());
    assert!(p.body().is_empty());
    assert_eq!(p.get().unwrap().metadata().content_length.value, 5);
}

#[test]
fn interim_then_final_response() {
    let mut p = ResponseParser::new(Config::response());
    p.start();
    feed_response(&mut p, b"HTTP/1.1 100 Continue\r\n\r\n").unwrap();
    assert!(p.is_complete());
    assert_eq!(p.get().unwrap().status_code(), 100);
    assert_eq!(p.get().unwrap().metadata().payload, Payload::None);

    p.start();
    feed_response(&mut p, b"HTTP/1.1 204 No Content\r\n\r\n").unwrap();
    assert_eq!(p.get().unwrap().status_code(), 204);
    assert!(p.is_complete());
}

#[test]
fn pipelined_requests() {
    let mut p = RequestParser::new(Config::default());
    p.start();
    feed_request(&mut p, b"GET /a HTTP/1.1\r\n\r\nGET /b HTTP/1.1\r\n\r\n").unwrap();
    assert_eq!(p.get().unwrap().target(), "/a");

    p.start();
    p.parse().unwrap();
    assert_eq!(p.get().unwrap().target(), "/b");
    assert!(p.is_complete());
}

#[test]
fn elastic_body() {
    let mut p = RequestParser::new(Config::default());
    p.start();
    let err = feed_request(&mut p, b"POST / HTTP/1.1\r\nContent-Length: 11\r\n\r\nhello").unwrap_err();
    assert!(err.is_need_data());
    assert!(p.got_header());

    p.set_body(BytesMut::new());
    feed_request(&mut p, b" world").unwrap();
    assert!(p.is_complete());
    assert_eq!(&p.take_body()[..], b"hello world");
}

#[test]
fn sink_body() {
    struct Collect {
        data: Rc<RefCell<Vec<u8>>>,
        closed: Rc<RefCell<bool>>,
    }
    impl Sink for Collect {
        fn write(&mut self, data: &[u8], more: bool) -> Result<usize> {
            self.data.borrow_mut().extend_from_slice(data);
            if !more {
                *self.closed.borrow_mut() = true;
            }
            Ok(data.len())
        }
    }

    let data = Rc::new(RefCell::new(Vec::new()));
    let closed = Rc::new(RefCell::new(false));

    let mut p = RequestParser::new(Config::default());
    p.start();
    let err = feed_request(&mut p, b"POST / HTTP/1.1\r\nContent-Length: 10\r\n\r\n").unwrap_err();
    assert!(err.is_need_data());
    p.set_body_sink(Collect {
        data: data.clone(),
        closed: closed.clone(),
    })
    .unwrap();

    feed_request(&mut p, b"0123456789").unwrap();
    assert!(p.is_complete());
    assert_eq!(&data.borrow()[..], b"0123456789");
    assert!(*closed.borrow());
}

#[test]
fn in_place_overflow_and_streaming_consume() {
    // a 1 MiB limit caps the in-place buffer at 64 KiB
    let mut p = ResponseParser::new(Config::response());
    p.start();

    let body = vec![b'z'; 80 * 1024];
    let mut wire = b"HTTP/1.1 200 OK\r\nContent-Length: 81920\r\n\r\n".to_vec();
    wire.extend_from_slice(&body);

    let mut collected = Vec::new();
    let mut rest = &wire[..];
    loop {
        let mut buf = p.prepare();
        let n = buf.write(rest);
        p.commit(n);
        rest = &rest[n..];
        match p.parse() {
            Ok(()) => break,
            Err(e) if e.is_need_data() => continue,
            Err(e) if e.is_in_place_overflow() => {
                let chunk = p.pull_body().to_vec();
                collected.extend_from_slice(&chunk);
                p.consume_body(chunk.len());
            }
            Err(e) => panic!("unexpected error: {:?}", e),
        }
    }
    collected.extend_from_slice(p.body());
    assert_eq!(collected, body);
}

#[test]
fn body_limit_is_enforced() {
    let cfg = Config {
        body_limit: 8,
        ..Config::default()
    };
    let mut p = RequestParser::new(cfg);
    p.start();
    let err =
        feed_request(&mut p, b"POST / HTTP/1.1\r\nContent-Length: 9\r\n\r\n123456789").unwrap_err();
    assert_eq!(err.kind(), Kind::BodyTooLarge);
}

#[test]
fn body_limit_override() {
    let cfg = Config {
        body_limit: 4,
        ..Config::default()
    };
    let mut p = RequestParser::new(cfg);
    p.start();
    let err = feed_request(&mut p, b"POST / HTTP/1.1\r\nContent-Length: 6\r\n\r\n").unwrap_err();
    assert!(err.is_need_data());
    p.set_body_limit(16);
    feed_request(&mut p, b"abcdef").unwrap();
    assert_eq!(p.body(), b"abcdef");
}

#[test]
fn field_size_limit_boundary() {
    let limits = HeaderLimits {
        max_field: 16,
        ..HeaderLimits::default()
    };
    let cfg = Config {
        headers: limits,
        ..Config::default()
    };

    // "X: " + 11 value bytes + CRLF = exactly 16
    let mut p = RequestParser::new(cfg);
    p.start();
    feed_request(&mut p, b"GET / HTTP/1.1\r\nX: abcdefghijk\r\n\r\n").unwrap();
    assert!(p.is_complete());

    let mut p = RequestParser::new(cfg);
    p.start();
    let err = feed_request(&mut p, b"GET / HTTP/1.1\r\nX: abcdefghijkl\r\n\r\n").unwrap_err();
    assert_eq!(err.kind(), Kind::FieldSizeLimit);
}

#[test]
fn fields_count_limit() {
    let limits = HeaderLimits {
        max_fields: 2,
        ..HeaderLimits::default()
    };
    let cfg = Config {
        headers: limits,
        ..Config::default()
    };
    let mut p = RequestParser::new(cfg);
    p.start();
    let err = feed_request(&mut p, b"GET / HTTP/1.1\r\nA: 1\r\nB: 2\r\nC: 3\r\n\r\n").unwrap_err();
    assert_eq!(err.kind(), Kind::FieldsLimit);
}

#[test]
fn start_line_limit() {
    let mut p = RequestParser::new(Config::default());
    p.start();
    let mut wire = b"GET /".to_vec();
    wire.extend(std::iter::repeat(b'a').take(5000));
    let err = feed_request(&mut p, &wire).unwrap_err();
    assert_eq!(err.kind(), Kind::StartLineLimit);
}

#[test]
fn headers_limit() {
    let mut p = RequestParser::new(Config::default());
    p.start();
    let mut wire = b"GET / HTTP/1.1\r\n".to_vec();
    for i in 0..200 {
        wire.extend_from_slice(format!("X-Filler-{}: {}\r\n", i, "v".repeat(40)).as_bytes());
    }
    let err = feed_request(&mut p, &wire).unwrap_err();
    assert_eq!(err.kind(), Kind::HeadersLimit);
}

#[test]
fn chunk_size_overflow() {
    let mut p = RequestParser::new(Config::default());
    p.start();
    let err = feed_request(
        &mut p,
        b"POST / HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\nffffffffffffffff0\r\n",
    )
    .unwrap_err();
    assert_eq!(err.kind(), Kind::NumericOverflow);
}

#[test]
fn bad_version_and_line_endings() {
    let mut p = RequestParser::new(Config::default());
    p.start();
    let err = feed_request(&mut p, b"GET / HTTP/2.0\r\n\r\n").unwrap_err();
    assert_eq!(err.kind(), Kind::BadVersion);

    let mut p = RequestParser::new(Config::default());
    p.start();
    let err = feed_request(&mut p, b"GET / HTTP/1.1\nX: 1\r\n\r\n\r\n").unwrap_err();
    assert_eq!(err.kind(), Kind::BadLineEnding);
}

#[test]
fn http10_te_with_content_length_is_rejected() {
    let mut p = RequestParser::new(Config::default());
    p.start();
    let err = feed_request(
        &mut p,
        b"POST / HTTP/1.0\r\nTransfer-Encoding: chunked\r\nContent-Length: 4\r\n\r\n",
    )
    .unwrap_err();
    assert_eq!(err.kind(), Kind::BadTransferEncoding);
}

#[test]
fn truncated_message_is_incomplete() {
    let mut p = RequestParser::new(Config::default());
    p.start();
    let err = feed_request(&mut p, b"POST / HTTP/1.1\r\nContent-Length: 10\r\n\r\nabc").unwrap_err();
    assert!(err.is_need_data());
    p.commit_eof();
    let err = p.parse().unwrap_err();
    assert_eq!(err.kind(), Kind::Incomplete);
}

#[test]
fn stray_crlf_before_request_line() {
    let mut p = RequestParser::new(Config::default());
    p.start();
    feed_request(&mut p, b"\r\n\r\nGET /x HTTP/1.1\r\n\r\n").unwrap();
    assert_eq!(p.get().unwrap().target(), "/x");
}

#[test]
fn unknown_method_is_preserved() {
    let mut p = RequestParser::new(Config::default());
    p.start();
    feed_request(&mut p, b"FROBNICATE /x HTTP/1.1\r\n\r\n").unwrap();
    let req = p.get().unwrap();
    assert_eq!(req.method(), Method::Unknown);
    assert_eq!(req.method_text(), "FROBNICATE");
}

#[test]
fn webdav_method_is_recognized() {
    let mut p = RequestParser::new(Config::default());
    p.start();
    feed_request(&mut p, b"PROPFIND /dav HTTP/1.1\r\nDepth: 1\r\n\r\n").unwrap();
    assert_eq!(p.get().unwrap().method(), Method::Propfind);
}

#[test]
fn connect_tunnel_leftover() {
    let mut p = RequestParser::new(Config::default());
    p.start();
    feed_request(
        &mut p,
        b"CONNECT host:443 HTTP/1.1\r\nHost: host\r\n\r\n\x16\x03\x01\x02",
    )
    .unwrap();
    assert!(p.is_complete());
    assert_eq!(p.get().unwrap().method(), Method::Connect);
    assert_eq!(&p.release_buffered_data()[..], b"\x16\x03\x01\x02");
}

#[test]
fn reset_recovers_after_failure() {
    let mut p = RequestParser::new(Config::default());
    p.start();
    feed_request(&mut p, b"BOGUS\r\n\r\n").unwrap_err();
    assert!(p.is_end_of_stream());
    assert_eq!(p.parse().unwrap_err().kind(), Kind::EndOfStream);

    p.reset();
    p.start();
    feed_request(&mut p, b"GET / HTTP/1.1\r\n\r\n").unwrap();
    assert!(p.is_complete());
}
