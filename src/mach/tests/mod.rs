use crate::lang::ErrorCode;
use crate::mach::{Address, CharInput, Event, Host, LineInput, Memory, Options, Runtime};

const OBJECTS: Address = 0x2e0;
const GLOBALS: Address = 0x100;
const SCRATCH: Address = 0x4a0;
const CODE: Address = 0x600;

#[derive(Default)]
struct Screen {
    printed: String,
}

impl Host for Screen {
    fn print(&mut self, text: &str) {
        self.printed.push_str(text);
    }
    fn read_line(&mut self, _: &str, _: usize, _: u16, _: &[u16]) -> LineInput {
        LineInput::Done {
            text: String::new(),
            terminator: 13,
        }
    }
    fn read_char(&mut self, _: u16) -> CharInput {
        CharInput::Key(13)
    }
}

fn image(version: u8, code: &[u8]) -> Vec<u8> {
    let mut image = vec![0u8; 0x800];
    image[0] = version;
    image[0x04] = 0x06;
    image[0x06] = 0x06;
    image[0x0a] = (OBJECTS >> 8) as u8;
    image[0x0b] = OBJECTS as u8;
    image[0x0c] = (GLOBALS >> 8) as u8;
    image[0x0e] = 0x05;
    image[CODE..CODE + code.len()].copy_from_slice(code);
    image
}

fn run_with(image: Vec<u8>, options: Options) -> (Runtime, Event, String) {
    let mut screen = Screen::default();
    let mut runtime = Runtime::new(image, options, &screen).unwrap();
    let event = runtime.execute(&mut screen, 10_000);
    (runtime, event, screen.printed)
}

fn run(image: Vec<u8>) -> (Runtime, Event, String) {
    let options = Options {
        random_seed: Some(7),
        ..Options::default()
    };
    run_with(image, options)
}

fn global(runtime: &Runtime, number: usize) -> u16 {
    runtime
        .memory()
        .read_word(GLOBALS + 2 * (number - 16))
        .unwrap()
}

#[test]
fn test_catch_throw() {
    let mut image = image(
        5,
        &[
            0xe0, 0x3f, 0x01, 0xc0, 0x10, // call_vs R1 -> G00
            0xe6, 0xbf, 0x10, // print_num G00
            0xba,
        ],
    );
    let r1 = [
        0x01, // one local
        0xb9, 0x01, // catch -> L01
        0xe0, 0x2f, 0x01, 0xc4, 0x01, 0x11, // call_vs R2 L01 -> G01
        0xb0,
    ];
    let r2 = [
        0x01, // one local
        0x3c, 0x2a, 0x01, // throw #42 L01
        0xb1,
    ];
    image[0x700..0x700 + r1.len()].copy_from_slice(&r1);
    image[0x710..0x710 + r2.len()].copy_from_slice(&r2);
    let (runtime, event, printed) = run(image);
    assert_eq!(event, Event::Quit);
    assert_eq!(printed, "42");
    assert_eq!(global(&runtime, 17), 0);
    assert_eq!(runtime.call_stack().depth(), 1);
}

#[test]
fn test_verify() {
    let code = [
        0xbd, 0xc5, // verify ?ok
        0xb2, 0xce, 0x85, // print "no"
        0xb2, 0xd2, 0x05, // print "ok"
        0xba,
    ];
    let mut good = image(5, &code);
    let sum = good[0x40..]
        .iter()
        .fold(0u16, |sum, &b| sum.wrapping_add(b as u16));
    good[0x1c] = (sum >> 8) as u8;
    good[0x1d] = sum as u8;
    let (_, _, printed) = run(good);
    assert_eq!(printed, "ok");

    let mut bad = image(5, &code);
    bad[0x1c] = 0xde;
    bad[0x1d] = 0xad;
    let (_, _, printed) = run(bad);
    assert_eq!(printed, "nook");
}

#[test]
fn test_object_tree() {
    let mut image = image(
        5,
        &[
            0x0e, 0x03, 0x01, // insert_obj #3 #1
            0x92, 0x01, 0x10, 0xc2, // get_child #1 -> G00 ?+0
            0x91, 0x03, 0x11, 0xc2, // get_sibling #3 -> G01 ?+0
            0x11, 0x01, 0x05, 0x12, // get_prop #1 #5 -> G02
            0x11, 0x02, 0x05, 0x13, // get_prop #2 #5 -> G03
            0x0b, 0x02, 0x0a, // set_attr #2 #10
            0x99, 0x03, // remove_obj #3
            0xe3, 0x57, 0x01, 0x05, 0x63, // put_prop #1 #5 #99
            0xba,
        ],
    );
    // Default for property 5.
    image[OBJECTS + 8..OBJECTS + 10].copy_from_slice(&[0x00, 0x63]);
    let first = OBJECTS + 126;
    let objects: [[u8; 14]; 3] = [
        [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 2, 0x03, 0x90],
        [0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 0x03, 0x98],
        [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0x03, 0x9c],
    ];
    for (i, entry) in objects.iter().enumerate() {
        let at = first + 14 * i;
        image[at..at + 14].copy_from_slice(entry);
    }
    image[0x390..0x395].copy_from_slice(&[0x00, 0x45, 0x00, 0x07, 0x00]);

    let (runtime, event, _) = run(image);
    assert_eq!(event, Event::Quit);
    assert_eq!(global(&runtime, 16), 3);
    assert_eq!(global(&runtime, 17), 2);
    assert_eq!(global(&runtime, 18), 7);
    assert_eq!(global(&runtime, 19), 0x63);
    let memory = runtime.memory();
    assert_eq!(memory.read_byte(first + 14 + 1).unwrap(), 0x20);
    assert_eq!(memory.read_word(first + 10).unwrap(), 2);
    assert_eq!(memory.read_word(first + 28 + 6).unwrap(), 0);
    assert_eq!(memory.read_word(first + 28 + 8).unwrap(), 0);
    assert_eq!(memory.read_word(0x392).unwrap(), 99);
}

#[test]
fn test_object_zero() {
    let code = [
        0x93, 0x00, 0x10, // get_parent #0 -> G00
        0xba,
    ];
    let (_, event, _) = run(image(5, &code));
    assert_eq!(event, Event::Quit);

    let options = Options {
        fatal_warnings: true,
        ..Options::default()
    };
    let (_, event, _) = run_with(image(5, &code), options);
    match event {
        Event::Error(error) => {
            assert!(error.is(ErrorCode::StrictWarning));
            assert_eq!(error.pc(), Some(CODE));
        }
        _ => panic!("{:?}", event),
    }
}

#[test]
fn test_tables() {
    let mut image = image(
        5,
        &[
            0xf7, 0x47, 0x03, 0x04, 0xa0, 0x03, 0x10, 0xc2, // scan_table #3 T #3 -> G00 ?+0
            0xf7, 0x47, 0x09, 0x04, 0xa0, 0x03, 0x11, 0xc2, // scan_table #9 T #3 -> G01 ?+0
            0xfd, 0x17, 0x04, 0xa0, 0x00, 0x02, // copy_table T #0 #2
            0xba,
        ],
    );
    image[SCRATCH..SCRATCH + 6].copy_from_slice(&[0, 1, 0, 2, 0, 3]);
    let (runtime, event, _) = run(image);
    assert_eq!(event, Event::Quit);
    assert_eq!(global(&runtime, 16) as Address, SCRATCH + 4);
    assert_eq!(global(&runtime, 17), 0);
    assert_eq!(
        runtime.memory().slice(SCRATCH, 6).unwrap(),
        &[0, 0, 0, 2, 0, 3]
    );
}

#[test]
fn test_stack_variable() {
    let code = [
        0xe8, 0x7f, 0x05, // push #5
        0xe8, 0x7f, 0x06, // push #6
        0x95, 0x00, // inc sp
        0xe9, 0x7f, 0x10, // pull G00
        0xe9, 0x7f, 0x11, // pull G01
        0xba,
    ];
    let (runtime, event, _) = run(image(5, &code));
    assert_eq!(event, Event::Quit);
    assert_eq!(global(&runtime, 16), 7);
    assert_eq!(global(&runtime, 17), 5);
    assert!(runtime.call_stack().values().is_empty());
}

#[test]
fn test_stack_underflow() {
    let code = [0xe9, 0x7f, 0x10]; // pull G00
    let (_, event, _) = run(image(5, &code));
    match event {
        Event::Error(error) => assert!(error.is(ErrorCode::StackUnderflow)),
        _ => panic!("{:?}", event),
    }
}

#[test]
fn test_print_unicode() {
    let code = [
        0xbe, 0x0b, 0x3f, 0x00, 0xe9, // print_unicode 'é'
        0xbe, 0x0b, 0x3f, 0x26, 0x3a, // print_unicode '☺'
        0xba,
    ];
    let (_, _, printed) = run(image(5, &code));
    assert_eq!(printed, "é?");
}

#[test]
fn test_unpack() {
    let memory = Memory::new(image(5, &[])).unwrap();
    assert_eq!(memory.unpack_routine(0x100), 0x400);
    assert_eq!(memory.unpack_routine(0x1000), 0x4000);
    let memory = Memory::new(image(8, &[])).unwrap();
    assert_eq!(memory.unpack_routine(0x100), 0x800);
    assert_eq!(memory.unpack_routine(0x1000), 0x8000);
    assert_eq!(memory.unpack_string(0x100), 0x800);
}

fn strict() -> Options {
    Options {
        random_seed: Some(7),
        fatal_warnings: true,
        ..Options::default()
    }
}

fn strict_warning_at(event: Event, pc: Address) {
    match event {
        Event::Error(error) => {
            assert!(error.is(ErrorCode::StrictWarning));
            assert_eq!(error.pc(), Some(pc));
        }
        _ => panic!("{:?}", event),
    }
}

#[test]
fn test_long_property_and_empty_name() {
    let mut image = image(
        5,
        &[
            0x11, 0x01, 0x05, 0x10, // get_prop #1 #5 -> G00
            0x9a, 0x01, // print_obj #1
            0xe5, 0x7f, 0x78, // print_char 'x'
            0xba,
        ],
    );
    let first = OBJECTS + 126;
    image[first + 12..first + 14].copy_from_slice(&[0x03, 0x90]);
    // No name, then property 5 with three bytes of data.
    image[0x390..0x397].copy_from_slice(&[0x00, 0x85, 0x03, 0x12, 0x34, 0x56, 0x00]);

    let (runtime, event, printed) = run(image.clone());
    assert_eq!(event, Event::Quit);
    assert_eq!(global(&runtime, 16), 0x1234);
    assert_eq!(printed, "x");

    let (_, event, printed) = run_with(image, strict());
    strict_warning_at(event, CODE);
    assert_eq!(printed, "");
}

#[test]
fn test_stream_mistakes() {
    let code = [
        0xf3, 0x3f, 0xff, 0xfd, // output_stream -3
        0xf3, 0x7f, 0x07, // output_stream 7
        0xf4, 0x7f, 0x05, // input_stream 5
        0xba,
    ];
    let (_, event, _) = run(image(5, &code));
    assert_eq!(event, Event::Quit);
    let (_, event, _) = run_with(image(5, &code), strict());
    strict_warning_at(event, CODE);
}
