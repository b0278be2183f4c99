use rust_i2l::fault::Fault;
use rust_i2l::machine::CODE_START;

mod common;
use common::run_program;

fn tos_after(stream: &str) -> u16 {
    let (m, _, result) = run_program(stream);
    result.expect("program faulted");
    m.peek_tos16()
}

#[test]
fn test_sto_and_lod_roundtrip() {
    // var(0) := 0x1234, then load it back
    let (m, _, result) = run_program("0B341203000001000000$");
    result.unwrap();
    assert_eq!(m.peek_tos16(), 0x1234);
    // The variable lives at the frame base.
    assert_eq!(m.read16(m.display[0]), 0x1234);
}

#[test]
fn test_adr_pushes_variable_address() {
    // adr 0,4 pushes display[0] + 4
    let (m, _, result) = run_program("21000400$");
    result.unwrap();
    assert_eq!(m.peek_tos16(), m.display[0] + 4);
}

#[test]
fn test_std_and_ldi_indirect() {
    // Store 0xbeef through a pushed address, then load it back through
    // the same address: adr 0,0 / imm 0xbeef / std / adr 0,0 / ldi
    let (m, _, result) = run_program("2100000BEFBE1F2100002200$");
    result.unwrap();
    assert_eq!(m.peek_tos16(), 0xbeef);
    assert_eq!(m.read16(m.display[0]), 0xbeef);
}

#[test]
fn test_lda_absolute() {
    // Constant data is loaded at CODE_START + 4; lda reads it directly.
    // Layout: lda 0x1704 / exi / word 0xcafe
    let (m, _, result) = run_program("230417\n00\nFECA$");
    result.unwrap();
    assert_eq!(m.read16(CODE_START + 4), 0xcafe);
    assert_eq!(m.peek_tos16(), 0xcafe);
}

#[test]
fn test_ldx_stx_byte_arrays() {
    // A two-entry byte array at a fixed data address; var(0) holds its
    // base. imm base / sto 0,0 / imm idx / imm val / stx 0,0 /
    // imm idx / ldx 0,0 / exi / two data bytes
    let stream = "0B1517\n030000\n0B0100\n0B4200\n040000\n0B0100\n020000\n00\n0000$";
    let (m, _, result) = run_program(stream);
    result.unwrap();
    // stx stored the low byte at base+1, ldx read it back zero-extended.
    assert_eq!(m.mem[0x1716], 0x42);
    assert_eq!(m.peek_tos16(), 0x0042);
}

#[test]
fn test_dupcat_duplicates_tos() {
    let (m, _, result) = run_program("0B11111D00$");
    result.unwrap();
    assert_eq!(m.peek_tos16(), 0x1111);
    assert_eq!(m.peek_nos16(), 0x1111);
}

#[test]
fn test_drp_discards_tos() {
    let (m, _, result) = run_program("0B11110B22222800$");
    result.unwrap();
    assert_eq!(m.peek_tos16(), 0x1111);
}

#[test]
fn test_dba_scales_index() {
    // nos=0x1000 base, tos=3 index: 2*3 + 0x1000
    assert_eq!(tos_after("0B00100B03001E00$"), 0x1006);
}

#[test]
fn test_dbi_indirect_word_fetch() {
    // Word table at 0x1708: entry 1 is 0x5678.
    // imm base / imm 1 / dbi / exi / table data
    let (m, _, result) = run_program("0B08170B01002000\n34127856$");
    result.unwrap();
    assert_eq!(m.peek_tos16(), 0x5678);
}

#[test]
fn test_inc_increments_and_pushes() {
    // var(0) := 5; inc 0,0 twice
    let (m, _, result) = run_program("0B050003000019000019000000$");
    result.unwrap();
    assert_eq!(m.peek_tos16(), 7);
    assert_eq!(m.peek_nos16(), 6);
    assert_eq!(m.read16(m.display[0]), 7);
}

#[test]
fn test_jmp_skips_code() {
    // jmp over an imm that would clobber TOS: imm 1 / jmp L / imm 2 / L: exi
    assert_eq!(tos_after("0B0100070917\n0B0200\n00$"), 1);
}

#[test]
fn test_jpc_jumps_only_on_false() {
    // imm 0 / jpc L / imm 0xdead / L: exi -> jump taken, stack empty of 0xdead
    let (m, _, result) = run_program("0B0000080917\n0BADDE\n00$");
    result.unwrap();
    assert_ne!(m.peek_tos16(), 0xdead);

    // imm 1 / jpc L / imm 0xdead / L: exi -> falls through
    assert_eq!(tos_after("0B0100080917\n0BADDE\n00$"), 0xdead);
}

#[test]
fn test_cjp_keeps_comparand() {
    // imm 7 / imm 7 / cjp L / imm 0xdead / L: exi
    // Equal: jump taken, the comparand 7 stays on the stack.
    let (m, _, result) = run_program("0B07000B0700250C17\n0BADDE\n00$");
    result.unwrap();
    assert_eq!(m.peek_tos16(), 7);

    // imm 7 / imm 8 / cjp L -> not equal, falls through to imm 0xdead
    assert_eq!(tos_after("0B07000B0800250C17\n0BADDE\n00$"), 0xdead);
}

#[test]
fn test_jsr_rts_use_value_stack() {
    // jsr SUB / exi / SUB: imm 9 / sto 0,2 / rts
    // The subroutine must leave its return address on top for rts.
    let (m, _, result) = run_program("260417\n00\n0B0900\n030002\n27$");
    result.unwrap();
    assert_eq!(m.read16(m.display[0] + 2), 9);
    assert_eq!(m.sp, 0x01ff, "return address was not consumed");
}

#[test]
fn test_cal_ret_restores_machine_state() {
    // cal 1,PROC / exi / PROC: ret
    let (m, _, result) = run_program("05020517\n00\n06$");
    result.unwrap();
    // Back at level 0 with the frame disposed: only the main frame is live.
    assert_eq!(m.level, 0);
    assert_eq!(m.hp, m.display[0]);
    assert_eq!(m.sp, 0x01ff);
}

#[test]
fn test_call_return_invariants_across_nesting() {
    // 0000: 05 02 05 17   cal 1, 0x1705
    // 0004: 00            exi
    // 0005: 05 04 0A 17   cal 2, 0x170A
    // 0009: 06            ret
    // 000A: 06            ret  (level 2 returns to 0x1709)
    let (m, _, result) = run_program("0502051700\n05040A17\n06\n06$");
    result.unwrap();
    assert_eq!(m.level, 0);
    assert_eq!(m.sp, 0x01ff);
    assert_eq!(m.hp, m.display[0]);
}

#[test]
fn test_hpi_bumps_heap_pointer() {
    // hpi 8 then exi; locals region grows by 8 bytes past the frame.
    let (m, _, result) = run_program("090800$");
    result.unwrap();
    assert_eq!(m.hp, m.display[0] + 8);
}

#[test]
fn test_arg_positions_arguments_as_locals() {
    // 0000: 09 04         hpi 4      (room for main's globals)
    // 0002: 0B 34 12      imm 0x1234
    // 0005: 0A 01         arg 1
    // 0007: 05 02 0C 17   cal 1, 0x170C
    // 000B: 00            exi
    // 000C: 01 02 00      lod 1,0
    // 000F: 03 00 00      sto 0,0
    // 0012: 06            ret
    let (m, _, result) = run_program("09040B34120A0105020C170001020003000006$");
    result.unwrap();
    // The argument landed where the callee's first local lives, and the
    // callee copied it into the caller's frame.
    assert_eq!(m.read16(m.display[0]), 0x1234);
    assert_eq!(m.level, 0);
}

#[test]
fn test_arg_count_zero_still_moves_one_byte() {
    // imm 0xab00 / arg 0 / exi: one byte (the stack top, which is the
    // high byte of the pushed word) moves to hp+6.
    let (m, _, result) = run_program("0B00AB0A0000$");
    result.unwrap();
    assert_eq!(m.mem[usize::from(m.hp) + 6], 0xab);
    // The low byte is still on the stack.
    assert_eq!(m.sp, 0x01ff - 1);
}

#[test]
fn test_short_global_load() {
    // var(2) := 0x1234 via sto 0,2, then opcode 0x81 pushes global word 1.
    let (m, _, result) = run_program("0B3412030002\n81\n00$");
    result.unwrap();
    assert_eq!(m.peek_tos16(), 0x1234);
}

#[test]
fn test_bad_opcode_faults_with_location() {
    // 0x3b is in the unregistered floating-point range.
    let (_, _, result) = run_program("3B00$");
    match result.unwrap_err() {
        Fault::BadOpcode { opcode, pc } => {
            assert_eq!(opcode, 0x3b);
            assert_eq!(pc, CODE_START);
        }
        other => panic!("expected BadOpcode, got {other:?}"),
    }
}

#[test]
fn test_ecl_is_unimplemented() {
    let (_, _, result) = run_program("29000000$");
    assert!(matches!(result.unwrap_err(), Fault::UnimplementedOpcode));
}
