//! End-to-end tests: assemble whole programs and execute them to completion.

use leben_emulator::asm::assemble;
use leben_emulator::isa::{ConditionFlags, Register};
use leben_emulator::machine::trace::{RecordingTracer, TraceEvent};
use leben_emulator::machine::{Machine, MachineState};

fn run_program(source: &str) -> Machine {
    let image = assemble(source).expect("program assembles");
    let mut machine = Machine::with_console();
    machine.load_image(image.origin, &image.bytes);
    machine.run(10_000).expect("program executes");
    machine
}

#[test]
fn counted_loop_accumulates() {
    let machine = run_program(
        "
        ORG 0100H
        MVI B, 5
        XRA A
LOOP:   ADD B
        DCR B
        JNZ LOOP
        STA 0200H
        HLT
",
    );
    assert_eq!(machine.state(), MachineState::Halted);
    assert_eq!(machine.register(Register::A), 15, "sum of 5..=1");
    assert_eq!(machine.register(Register::B), 0);
    assert_eq!(machine.memory().read_u8(0x0200), 15, "STA result");
}

#[test]
fn string_loop_writes_console_output() {
    let machine = run_program(
        "
        LXI H, MSG
NEXT:   MOV A, M
        CPI 0
        JZ DONE
        OUT 1
        INX H
        JMP NEXT
DONE:   HLT
MSG:    DB 48H, 49H, 0
",
    );
    assert_eq!(machine.ports().output(), b"HI");
    assert_eq!(machine.state(), MachineState::Halted);
}

#[test]
fn subroutine_call_returns_through_stack() {
    let machine = run_program(
        "
        LXI SP, 0FF00H
        MVI A, 7
        CALL DOUBL
        HLT
DOUBL:  ADD A
        RET
",
    );
    assert_eq!(machine.register(Register::A), 14);
    assert_eq!(machine.sp(), 0xFF00, "stack balanced after RET");
    assert_eq!(machine.state(), MachineState::Halted);
}

#[test]
fn decimal_adjust_keeps_bcd_sums() {
    let machine = run_program("MVI A, 19H\nADI 28H\nDAA\nHLT\n");
    assert_eq!(machine.register(Register::A), 0x47, "19 + 28 = 47 in BCD");
    assert!(!machine.flags().contains(ConditionFlags::CARRY));
}

#[test]
fn step_budget_stops_endless_programs() {
    let image = assemble("SPIN: JMP SPIN\n").expect("program assembles");
    let mut machine = Machine::with_console();
    machine.load_image(image.origin, &image.bytes);
    let steps = machine.run(100).expect("program executes");
    assert_eq!(steps, 100);
    assert_eq!(machine.state(), MachineState::Running, "never halts");
}

#[test]
fn tracer_sees_each_executed_instruction() {
    let image = assemble("MVI A, 1\nHLT\n").expect("program assembles");
    let mut machine = Machine::with_console();
    machine.load_image(image.origin, &image.bytes);
    let recorder = RecordingTracer::new();
    machine.set_tracer(Some(Box::new(recorder.clone())));
    machine.run(10).expect("program executes");

    let texts: Vec<String> = recorder
        .events()
        .iter()
        .map(|event| match event {
            TraceEvent::Fetch { address, text, .. } => format!("0x{address:04X} {text}"),
            TraceEvent::Halt { address } => format!("0x{address:04X} halted"),
        })
        .collect();
    assert_eq!(
        texts,
        ["0x0000 MVI A, 0x01", "0x0002 HLT", "0x0002 halted"],
        "one fetch per instruction plus the halt marker"
    );
}
