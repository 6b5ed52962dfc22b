mod common;
use common::*;
use zcode::lang::ErrorCode;
use zcode::mach::{Event, Purpose};

#[test]
fn test_memory_stream() {
    let mut code = vec![0xf3, 0x4f, 0x03, 0x04, 0xa0]; // output_stream 3 SCRATCH
    code.extend(print("abc"));
    code.extend(&[0xf3, 0x3f, 0xff, 0xfd]); // output_stream -3
    code.extend(print("x"));
    code.push(0xba);
    let mut host = TestHost::new();
    let (runtime, event) = run(Story::new(5).code(&code).build(), &mut host);
    assert_eq!(event, Event::Quit);
    assert_eq!(host.output, "x");
    assert_eq!(runtime.memory().read_word(SCRATCH).unwrap(), 3);
    assert_eq!(runtime.memory().slice(SCRATCH + 2, 3).unwrap(), b"abc");
}

#[test]
fn test_memory_stream_too_deep() {
    let mut code = vec![];
    for _ in 0..17 {
        code.extend(&[0xf3, 0x4f, 0x03, 0x04, 0xa0]);
    }
    code.push(0xba);
    let mut host = TestHost::new();
    let (_, event) = run(Story::new(5).code(&code).build(), &mut host);
    match event {
        Event::Error(error) => {
            assert!(error.is(ErrorCode::BadStream));
            assert_eq!(error.pc(), Some(CODE + 16 * 5));
        }
        _ => panic!("{:?}", event),
    }
}

#[test]
fn test_transcript_from_flags2() {
    let mut code = vec![0xe1, 0x57, 0x10, 0x00, 0x01]; // storew $10 #0 #1
    code.extend(print("hi"));
    code.push(0xba);
    let mut host = TestHost::new();
    let (runtime, event) = run(Story::new(5).code(&code).build(), &mut host);
    assert_eq!(event, Event::Quit);
    assert_eq!(host.output, "hi");
    let transcript = String::from_utf8(host.file(Purpose::Transcript)).unwrap();
    assert!(transcript.starts_with("*** Transcript"));
    assert!(transcript.ends_with("hi"));
    assert_eq!(runtime.memory().read_word(0x10).unwrap() & 1, 1);
}

#[test]
fn test_transcript_survives_restart() {
    let mut code = vec![0xf3, 0x7f, 0x02]; // output_stream 2
    code.extend(print("one"));
    code.push(0xba);
    let mut host = TestHost::new();
    let (mut runtime, event) = run(Story::new(5).code(&code).build(), &mut host);
    assert_eq!(event, Event::Quit);
    runtime.restart(&mut host).unwrap();
    assert_eq!(runtime.memory().read_word(0x10).unwrap() & 1, 1);
    assert_eq!(exec(&mut runtime, &mut host), Event::Quit);
    let transcript = String::from_utf8(host.file(Purpose::Transcript)).unwrap();
    assert!(transcript.contains("one"));
    assert_eq!(host.output, "oneone");
}
