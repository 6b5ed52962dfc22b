mod common;
use common::*;
use zcode::lang::ErrorCode;
use zcode::mach::{snapshot, Event, Options, Purpose, Runtime};

fn save_story_v5() -> Vec<u8> {
    Story::new(5)
        .code(&[
            0x0d, 0x10, 0x01, // store G00 #1
            0xbe, 0x00, 0xff, 0x11, // save -> G01
            0xe6, 0xbf, 0x11, // print_num G01
            0x0d, 0x10, 0x09, // store G00 #9
            0xba, // quit
        ])
        .build()
}

#[test]
fn test_save_then_restore() {
    let mut host = TestHost::new();
    let (mut runtime, event) = run(save_story_v5(), &mut host);
    assert_eq!(event, Event::Quit);
    assert_eq!(host.output, "1");
    assert_eq!(runtime.memory().read_word(GLOBALS).unwrap(), 9);
    assert!(host.file(Purpose::SaveGame).starts_with(b"FORM"));

    runtime.restore(&mut host).unwrap();
    assert_eq!(runtime.memory().read_word(GLOBALS).unwrap(), 1);
    assert_eq!(runtime.memory().read_word(GLOBALS + 2).unwrap(), 2);
    assert_eq!(runtime.pc(), CODE + 7);
    assert_eq!(exec(&mut runtime, &mut host), Event::Quit);
    assert_eq!(host.output, "12");
}

#[test]
fn test_save_then_restore_v3() {
    let mut code = vec![
        0x0d, 0x10, 0x01, // store G00 #1
        0xb5, 0xc5, // save ?ok
    ];
    code.extend(print("no"));
    code.extend(print("ok"));
    code.push(0xba);
    let mut host = TestHost::new();
    let (mut runtime, event) = run(Story::new(3).code(&code).build(), &mut host);
    assert_eq!(event, Event::Quit);
    assert_eq!(host.output, "ok");
    runtime.restore(&mut host).unwrap();
    assert_eq!(runtime.pc(), CODE + 8);
    assert_eq!(exec(&mut runtime, &mut host), Event::Quit);
    assert_eq!(host.output, "okok");
}

#[test]
fn test_restore_without_file() {
    let story = Story::new(5).code(&[
        0xbe, 0x01, 0xff, 0x11, // restore -> G01
        0xe6, 0xbf, 0x11, // print_num G01
        0xba, // quit
    ]);
    let mut host = TestHost::new();
    let (_, event) = run(story.build(), &mut host);
    assert_eq!(event, Event::Quit);
    assert_eq!(host.output, "0");
}

#[test]
fn test_wrong_story_rejected() {
    let mut host = TestHost::new();
    run(save_story_v5(), &mut host);
    let saved = host.file(Purpose::SaveGame);

    let other = Story::new(5)
        .at(0x12, b"999999")
        .code(&[0x0d, 0x10, 0x05, 0xba])
        .build();
    let mut other_host = TestHost::new();
    let (mut runtime, _) = run(other, &mut other_host);
    let dynamic = runtime.memory().dynamic().to_vec();
    let pc = runtime.pc();
    let error = runtime.restore_bytes(&saved).unwrap_err();
    assert!(error.is(ErrorCode::WrongStory));
    assert!(!error.is_fatal());
    assert_eq!(runtime.memory().dynamic(), &dynamic[..]);
    assert_eq!(runtime.pc(), pc);
}

#[test]
fn test_garbage_rejected() {
    let mut host = TestHost::new();
    let (mut runtime, _) = run(save_story_v5(), &mut host);
    let error = runtime.restore_bytes(b"not a save file").unwrap_err();
    assert!(!error.is_fatal());
    let mut saved = host.file(Purpose::SaveGame);
    saved.truncate(saved.len() - 10);
    assert!(runtime.restore_bytes(&saved).is_err());
    assert_eq!(runtime.memory().read_word(GLOBALS).unwrap(), 9);
}

#[test]
fn test_undo() {
    let mut code = vec![
        0x0d, 0x10, 0x01, // store G00 #1
        0xbe, 0x09, 0xff, 0x11, // save_undo -> G01
        0x41, 0x11, 0x02, 0xcf, // je G01 #2 ?done
        0x0d, 0x10, 0x05, // store G00 #5
        0xbe, 0x0a, 0xff, 0x12, // restore_undo -> G02
    ];
    code.extend(print("fail"));
    code.push(0xba);
    // done:
    code.extend(&[0xe6, 0xbf, 0x10, 0xba]);
    let mut host = TestHost::new();
    let (runtime, event) = run(Story::new(5).code(&code).build(), &mut host);
    assert_eq!(event, Event::Quit);
    assert_eq!(host.output, "1");
    assert_eq!(runtime.memory().read_word(GLOBALS + 2).unwrap(), 2);
    assert_eq!(runtime.undo_depth(), 0);
}

#[test]
fn test_undo_disabled() {
    let story = Story::new(5).code(&[
        0xbe, 0x09, 0xff, 0x11, // save_undo -> G01
        0xe6, 0xbf, 0x11, // print_num G01
        0xbe, 0x0a, 0xff, 0x12, // restore_undo -> G02
        0xe6, 0xbf, 0x12, // print_num G02
        0xba, // quit
    ]);
    let options = Options {
        undo_levels: 0,
        ..options()
    };
    let mut host = TestHost::new();
    let mut runtime = Runtime::new(story.build(), options, &host).unwrap();
    assert_eq!(exec(&mut runtime, &mut host), Event::Quit);
    assert_eq!(host.output, "-10");
    assert!(runtime.undo().unwrap_err().is(ErrorCode::NothingToUndo));
}

#[test]
fn test_capture_parse() {
    let story = Story::new(5)
        .code(&[
            0xe0, 0x17, 0x01, 0xc0, 0x03, 0x04, 0x10, // call_vs R #3 #4 -> G00
            0xba,
        ])
        .at(
            ROUTINE,
            &[
                0x02, // two locals
                0xe8, 0x7f, 0x09, // push #9
                0xe8, 0x7f, 0x0a, // push #10
                0x0d, 0x10, 0x4d, // store G00 #77
                0xba, // quit
            ],
        );
    let mut host = TestHost::new();
    let (runtime, event) = run(story.build(), &mut host);
    assert_eq!(event, Event::Quit);
    let stack = runtime.call_stack();
    assert_eq!(stack.depth(), 2);
    for &compressed in &[true, false] {
        let bytes =
            snapshot::capture(runtime.memory(), stack, CODE + 6, compressed, None).unwrap();
        let restored = snapshot::parse(&bytes, runtime.memory()).unwrap();
        assert_eq!(restored.dynamic, runtime.memory().dynamic());
        assert_eq!(restored.stack.frames(), stack.frames());
        assert_eq!(restored.stack.values(), &[9, 10]);
        assert_eq!(restored.pc, CODE + 6);
        assert_eq!(restored.stack.frame().locals, vec![3, 4]);
        assert_eq!(restored.stack.frame().arguments, 2);
    }
}
