//! End-to-end serializer scenarios.

use bytes::Bytes;
use h1_codec::parser;
use h1_codec::serializer::{Config, Serializer};
use h1_codec::{
    BytesSource, Fields, Kind, Request, Response, ResponseParser, Source, SourceRead, Version,
};

fn drain(sr: &mut Serializer) -> Vec<u8> {
    let mut wire = Vec::new();
    let mut idle = 0;
    while !sr.is_done() {
        let out = sr.prepare().unwrap();
        let n = out.total();
        if n == 0 {
            idle += 1;
            assert!(idle < 3, "serializer made no progress");
            continue;
        }
        idle = 0;
        for s in out.slices() {
            wire.extend_from_slice(s);
        }
        sr.consume(n);
    }
    wire
}

#[test]
fn header_only() {
    let mut req = Request::new();
    req.set_start_line("GET", "/x", Version::Http11).unwrap();
    req.append("Host", "example.com").unwrap();

    let mut sr = Serializer::new(Config::default());
    sr.start(&req).unwrap();
    let wire = drain(&mut sr);
    assert_eq!(wire, b"GET /x HTTP/1.1\r\nHost: example.com\r\n\r\n");
}

#[test]
fn buffers_with_content_length() {
    let mut res = Response::new();
    res.set_payload_size(11).unwrap();

    let mut sr = Serializer::new(Config::default());
    sr.start_buffers(
        &res,
        vec![Bytes::from_static(b"hello "), Bytes::from_static(b"world")],
    )
    .unwrap();
    let wire = drain(&mut sr);
    assert_eq!(
        wire,
        b"HTTP/1.1 200 OK\r\nContent-Length: 11\r\n\r\nhello world"
    );
}

#[test]
fn buffers_length_mismatch() {
    let mut res = Response::new();
    res.set_payload_size(3).unwrap();

    let mut sr = Serializer::new(Config::default());
    let err = sr
        .start_buffers(&res, vec![Bytes::from_static(b"hello")])
        .unwrap_err();
    assert_eq!(err.kind(), Kind::BodyTooLarge);

    let mut sr = Serializer::new(Config::default());
    let mut res = Response::new();
    res.set_payload_size(9).unwrap();
    let err = sr
        .start_buffers(&res, vec![Bytes::from_static(b"hello")])
        .unwrap_err();
    assert_eq!(err.kind(), Kind::Incomplete);
}

#[test]
fn buffers_chunked_is_one_chunk() {
    let mut res = Response::new();
    res.set_chunked(true).unwrap();

    let mut sr = Serializer::new(Config::default());
    sr.start_buffers(&res, vec![Bytes::from_static(b"hello!")])
        .unwrap();
    let wire = drain(&mut sr);
    assert_eq!(
        wire,
        b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n6\r\nhello!\r\n0\r\n\r\n"
    );
}

#[test]
fn chunked_with_trailers() {
    let mut res = Response::new();
    res.set_chunked(true).unwrap();

    let mut trailers = Fields::new();
    trailers.append("Checksum", "abc123").unwrap();

    let mut sr = Serializer::new(Config::default());
    sr.set_trailers(trailers);
    sr.start_buffers(&res, vec![Bytes::from_static(b"data")])
        .unwrap();
    let wire = drain(&mut sr);
    assert_eq!(
        wire,
        b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n\
          4\r\ndata\r\n0\r\nChecksum: abc123\r\n\r\n"
    );
}

#[test]
fn empty_chunked_body() {
    let mut res = Response::new();
    res.set_chunked(true).unwrap();

    let mut sr = Serializer::new(Config::default());
    sr.start(&res).unwrap();
    let wire = drain(&mut sr);
    assert_eq!(
        wire,
        b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n0\r\n\r\n"
    );
}

#[test]
fn source_body_chunked() {
    let mut res = Response::new();
    res.set_chunked(true).unwrap();

    let mut sr = Serializer::new(Config::default());
    sr.start_source(&res, BytesSource::new(&b"streamed payload"[..]))
        .unwrap();
    let wire = drain(&mut sr);
    assert_eq!(
        wire,
        b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n\
          10\r\nstreamed payload\r\n0\r\n\r\n"
    );
}

#[test]
fn trickling_source_emits_many_chunks() {
    struct Trickle {
        data: &'static [u8],
    }
    impl Source for Trickle {
        fn read(&mut self, dest: &mut [u8]) -> h1_codec::Result<SourceRead> {
            let n = self.data.len().min(dest.len()).min(3);
            dest[..n].copy_from_slice(&self.data[..n]);
            self.data = &self.data[n..];
            Ok(SourceRead {
                bytes: n,
                finished: self.data.is_empty(),
            })
        }
    }

    let mut res = Response::new();
    res.set_chunked(true).unwrap();
    let mut sr = Serializer::new(Config::default());
    sr.start_source(&res, Trickle { data: b"abcdefgh" }).unwrap();
    let wire = drain(&mut sr);
    assert_eq!(
        wire,
        b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n\
          3\r\nabc\r\n3\r\ndef\r\n2\r\ngh\r\n0\r\n\r\n"
    );
}

#[test]
fn source_with_content_length() {
    let mut res = Response::new();
    res.set_payload_size(8).unwrap();
    let mut sr = Serializer::new(Config::default());
    sr.start_source(&res, BytesSource::new(&b"12345678"[..]))
        .unwrap();
    let wire = drain(&mut sr);
    assert_eq!(wire, b"HTTP/1.1 200 OK\r\nContent-Length: 8\r\n\r\n12345678");
}

#[test]
fn source_shorter_than_declared() {
    let mut res = Response::new();
    res.set_payload_size(10).unwrap();
    let mut sr = Serializer::new(Config::default());
    sr.start_source(&res, BytesSource::new(&b"1234"[..])).unwrap();

    let mut err = None;
    for _ in 0..10 {
        match sr.prepare() {
            Ok(out) => {
                let n = out.total();
                sr.consume(n);
            }
            Err(e) => {
                err = Some(e);
                break;
            }
        }
    }
    assert_eq!(err.expect("must fail").kind(), Kind::Incomplete);
}

#[test]
fn stream_body() {
    let mut req = Request::new();
    req.set_start_line("POST", "/up", Version::Http11).unwrap();
    req.set_chunked(true).unwrap();

    let mut sr = Serializer::new(Config::default());
    sr.start_stream(&req).unwrap();

    let mut wire = Vec::new();
    for piece in [&b"part one "[..], &b"and two"[..]] {
        let dst = sr.stream_prepare();
        dst[..piece.len()].copy_from_slice(piece);
        sr.stream_commit(piece.len());
        let out = sr.prepare().unwrap();
        let n = out.total();
        for s in out.slices() {
            wire.extend_from_slice(s);
        }
        sr.consume(n);
    }
    sr.stream_close();
    wire.extend_from_slice(&drain(&mut sr));

    assert_eq!(
        wire,
        b"POST /up HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n\
          9\r\npart one \r\n7\r\nand two\r\n0\r\n\r\n"
    );
}

#[test]
fn expect_100_continue_pause_and_resume() {
    let mut req = Request::new();
    req.set_start_line("PUT", "/file", Version::Http11).unwrap();
    req.set_expect_100_continue(true).unwrap();
    req.set_payload_size(10).unwrap();

    let mut sr = Serializer::new(Config::default());
    sr.start_buffers(&req, vec![Bytes::from_static(b"0123456789")])
        .unwrap();

    // only the header comes out first
    let out = sr.prepare().unwrap();
    let header: Vec<u8> = out.slices().concat();
    assert!(header.ends_with(b"\r\n\r\n"));
    assert!(!header.ends_with(b"0123456789"));
    let n = out.total();
    sr.consume(n);

    // then the pause signal, until resumed
    assert_eq!(sr.prepare().unwrap_err().kind(), Kind::ExpectContinue);
    assert_eq!(sr.prepare().unwrap_err().kind(), Kind::ExpectContinue);

    sr.resume();
    let rest = drain(&mut sr);
    assert_eq!(rest, b"0123456789");
    assert!(sr.is_done());
}

#[test]
fn reset_clears_the_pause() {
    let mut req = Request::new();
    req.set_expect_100_continue(true).unwrap();
    req.set_payload_size(4).unwrap();

    let mut sr = Serializer::new(Config::default());
    sr.start_buffers(&req, vec![Bytes::from_static(b"wxyz")])
        .unwrap();
    let out = sr.prepare().unwrap();
    let n = out.total();
    sr.consume(n);
    assert!(sr.prepare().unwrap_err().is_expect_continue());

    sr.reset();
    let mut res = Response::new();
    res.set_payload_size(0).unwrap();
    sr.start(&res).unwrap();
    let wire = drain(&mut sr);
    assert_eq!(wire, b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n");
}

#[test]
fn head_response_suppresses_body() {
    let mut res = Response::new();
    res.set_payload_size(1234).unwrap();

    let mut sr = Serializer::new(Config::default());
    sr.start_head(&res).unwrap();
    let wire = drain(&mut sr);
    assert_eq!(wire, b"HTTP/1.1 200 OK\r\nContent-Length: 1234\r\n\r\n");
}

#[test]
fn byte_at_a_time_consumption() {
    let mut res = Response::new();
    res.set_chunked(true).unwrap();

    let mut sr = Serializer::new(Config::default());
    sr.start_buffers(&res, vec![Bytes::from_static(b"abc"), Bytes::from_static(b"def")])
        .unwrap();

    let mut wire = Vec::new();
    while !sr.is_done() {
        let out = sr.prepare().unwrap();
        let first = out.slices()[0];
        wire.push(first[0]);
        sr.consume(1);
    }
    assert_eq!(
        wire,
        b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n6\r\nabcdef\r\n0\r\n\r\n"
    );
}

#[test]
fn serialized_output_parses_back() {
    let mut req = Request::new();
    req.set_start_line("POST", "/echo", Version::Http11).unwrap();
    req.append("Host", "h").unwrap();
    req.set_chunked(true).unwrap();

    let mut sr = Serializer::new(Config::default());
    sr.start_source(&req, BytesSource::new(&b"round trip body"[..]))
        .unwrap();
    let wire = drain(&mut sr);

    let mut p = h1_codec::RequestParser::new(parser::Config::default());
    p.start();
    let mut buf = p.prepare();
    let n = buf.write(&wire);
    p.commit(n);
    p.parse().unwrap();
    assert!(p.is_complete());
    assert_eq!(p.body(), b"round trip body");
    assert_eq!(p.get().unwrap().target(), "/echo");
}

#[test]
fn gzip_round_trip_through_both_machines() {
    let plain: Vec<u8> = b"a moderately compressible payload ".repeat(400);

    let mut res = Response::new();
    res.append("Transfer-Encoding", "gzip, chunked").unwrap();

    let mut sr = Serializer::new(Config {
        apply_gzip_encoder: true,
        ..Config::default()
    });
    sr.start_source(&res, BytesSource::new(plain.clone())).unwrap();
    let wire = drain(&mut sr);
    // the wire form is actually compressed
    assert!(wire.len() < plain.len() / 2);

    let mut p = ResponseParser::new(parser::Config {
        apply_gzip_decoder: true,
        ..parser::Config::response()
    });
    p.start();
    let mut rest = &wire[..];
    loop {
        let mut buf = p.prepare();
        let n = buf.write(rest);
        p.commit(n);
        rest = &rest[n..];
        match p.parse() {
            Ok(()) => break,
            Err(e) if e.is_need_data() => continue,
            Err(e) => panic!("unexpected error: {:?}", e),
        }
    }
    assert!(p.is_complete());
    assert_eq!(p.body(), &plain[..]);
}

#[test]
fn deflate_round_trip_through_both_machines() {
    let plain: Vec<u8> = b"zlib wrapped deflate data ".repeat(200);

    let mut res = Response::new();
    res.append("Transfer-Encoding", "deflate, chunked").unwrap();

    let mut sr = Serializer::new(Config {
        apply_deflate_encoder: true,
        ..Config::default()
    });
    sr.start_source(&res, BytesSource::new(plain.clone())).unwrap();
    let wire = drain(&mut sr);

    let mut p = ResponseParser::new(parser::Config {
        apply_deflate_decoder: true,
        ..parser::Config::response()
    });
    p.start();
    let mut rest = &wire[..];
    loop {
        let mut buf = p.prepare();
        let n = buf.write(rest);
        p.commit(n);
        rest = &rest[n..];
        match p.parse() {
            Ok(()) => break,
            Err(e) if e.is_need_data() => continue,
            Err(e) => panic!("unexpected error: {:?}", e),
        }
    }
    assert_eq!(p.body(), &plain[..]);
}
