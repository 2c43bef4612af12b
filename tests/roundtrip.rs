//! Listing fidelity: disassembled output is itself valid assembler input.

use std::fs;

use leben_emulator::asm::assemble;
use leben_emulator::isa::disassemble;

const PROGRAM: &str = "
        ORG 0100H
        LXI SP, 0FF00H
        MVI A, 5
LOOP:   DCR A
        JNZ LOOP
        PUSH PSW
        RST 2
        HLT
TABLE:  DB 0DEH, 0ADH
";

#[test]
fn listing_reassembles_to_the_same_image() {
    let image = assemble(PROGRAM).expect("program assembles");
    let listing = disassemble(&image.bytes, image.origin);

    let mut source = format!("ORG 0x{:04X}\n", image.origin);
    for entry in &listing {
        source.push_str(&entry.text);
        source.push('\n');
    }

    let reassembled = assemble(&source).expect("listing reassembles");
    assert_eq!(reassembled.origin, image.origin);
    assert_eq!(reassembled.bytes, image.bytes, "listing:\n{source}");
}

#[test]
fn images_survive_a_trip_through_disk() {
    let image = assemble(PROGRAM).expect("program assembles");

    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("program.bin");
    fs::write(&path, &image.bytes).expect("write image");

    let loaded = fs::read(&path).expect("read image back");
    assert_eq!(loaded, image.bytes);

    let listing = disassemble(&loaded, image.origin);
    assert_eq!(listing[0].address, 0x0100);
    assert_eq!(listing[0].text, "LXI SP, 0xFF00");
}
