/// Operand count class, which selects the opcode table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OperandCount {
    Op0,
    Op1,
    Op2,
    Var,
    Ext,
}

/// ## Z-machine instruction set
///
/// Every opcode of versions 3 to 8. Some numbers mean different things
/// in different versions, so decoding needs the version. `Save`,
/// `Restore` and `Not` each live in two tables.

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Opcode {
    // *** 2OP
    Je,
    Jl,
    Jg,
    DecChk,
    IncChk,
    Jin,
    Test,
    Or,
    And,
    TestAttr,
    SetAttr,
    ClearAttr,
    Store,
    InsertObj,
    Loadw,
    Loadb,
    GetProp,
    GetPropAddr,
    GetNextProp,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Call2s,
    Call2n,
    SetColour,
    Throw,

    // *** 1OP
    Jz,
    GetSibling,
    GetChild,
    GetParent,
    GetPropLen,
    Inc,
    Dec,
    PrintAddr,
    Call1s,
    RemoveObj,
    PrintObj,
    Ret,
    Jump,
    PrintPaddr,
    Load,
    Not,
    Call1n,

    // *** 0OP
    Rtrue,
    Rfalse,
    Print,
    PrintRet,
    Nop,
    Save,
    Restore,
    Restart,
    RetPopped,
    Pop,
    Catch,
    Quit,
    NewLine,
    ShowStatus,
    Verify,
    Piracy,

    // *** VAR
    CallVs,
    Storew,
    Storeb,
    PutProp,
    Read,
    PrintChar,
    PrintNum,
    Random,
    Push,
    Pull,
    SplitWindow,
    SetWindow,
    CallVs2,
    EraseWindow,
    EraseLine,
    SetCursor,
    GetCursor,
    SetTextStyle,
    BufferMode,
    OutputStream,
    InputStream,
    SoundEffect,
    ReadChar,
    ScanTable,
    CallVn,
    CallVn2,
    Tokenise,
    EncodeText,
    CopyTable,
    PrintTable,
    CheckArgCount,

    // *** EXT
    LogShift,
    ArtShift,
    SetFont,
    DrawPicture,
    PictureData,
    ErasePicture,
    SetMargins,
    SaveUndo,
    RestoreUndo,
    PrintUnicode,
    CheckUnicode,
    SetTrueColour,
    MoveWindow,
    WindowSize,
    WindowStyle,
    GetWindProp,
    ScrollWindow,
    PopStack,
    ReadMouse,
    MouseWindow,
    PushStack,
    PutWindProp,
    PrintForm,
    MakeMenu,
    PictureTable,
    BufferScreen,
}

impl Opcode {
    pub fn decode(count: OperandCount, number: u8, version: u8) -> Option<Opcode> {
        use Opcode::*;
        use OperandCount::*;
        let v = version;
        Some(match (count, number) {
            (Op2, 1) => Je,
            (Op2, 2) => Jl,
            (Op2, 3) => Jg,
            (Op2, 4) => DecChk,
            (Op2, 5) => IncChk,
            (Op2, 6) => Jin,
            (Op2, 7) => Test,
            (Op2, 8) => Or,
            (Op2, 9) => And,
            (Op2, 10) => TestAttr,
            (Op2, 11) => SetAttr,
            (Op2, 12) => ClearAttr,
            (Op2, 13) => Store,
            (Op2, 14) => InsertObj,
            (Op2, 15) => Loadw,
            (Op2, 16) => Loadb,
            (Op2, 17) => GetProp,
            (Op2, 18) => GetPropAddr,
            (Op2, 19) => GetNextProp,
            (Op2, 20) => Add,
            (Op2, 21) => Sub,
            (Op2, 22) => Mul,
            (Op2, 23) => Div,
            (Op2, 24) => Mod,
            (Op2, 25) if v >= 4 => Call2s,
            (Op2, 26) if v >= 5 => Call2n,
            (Op2, 27) if v >= 5 => SetColour,
            (Op2, 28) if v >= 5 => Throw,

            (Op1, 0) => Jz,
            (Op1, 1) => GetSibling,
            (Op1, 2) => GetChild,
            (Op1, 3) => GetParent,
            (Op1, 4) => GetPropLen,
            (Op1, 5) => Inc,
            (Op1, 6) => Dec,
            (Op1, 7) => PrintAddr,
            (Op1, 8) if v >= 4 => Call1s,
            (Op1, 9) => RemoveObj,
            (Op1, 10) => PrintObj,
            (Op1, 11) => Ret,
            (Op1, 12) => Jump,
            (Op1, 13) => PrintPaddr,
            (Op1, 14) => Load,
            (Op1, 15) if v <= 4 => Not,
            (Op1, 15) => Call1n,

            (Op0, 0) => Rtrue,
            (Op0, 1) => Rfalse,
            (Op0, 2) => Print,
            (Op0, 3) => PrintRet,
            (Op0, 4) => Nop,
            (Op0, 5) if v <= 4 => Save,
            (Op0, 6) if v <= 4 => Restore,
            (Op0, 7) => Restart,
            (Op0, 8) => RetPopped,
            (Op0, 9) if v <= 4 => Pop,
            (Op0, 9) => Catch,
            (Op0, 10) => Quit,
            (Op0, 11) => NewLine,
            (Op0, 12) => ShowStatus,
            (Op0, 13) => Verify,
            (Op0, 15) if v >= 5 => Piracy,

            (Var, 0) => CallVs,
            (Var, 1) => Storew,
            (Var, 2) => Storeb,
            (Var, 3) => PutProp,
            (Var, 4) => Read,
            (Var, 5) => PrintChar,
            (Var, 6) => PrintNum,
            (Var, 7) => Random,
            (Var, 8) => Push,
            (Var, 9) => Pull,
            (Var, 10) => SplitWindow,
            (Var, 11) => SetWindow,
            (Var, 12) if v >= 4 => CallVs2,
            (Var, 13) if v >= 4 => EraseWindow,
            (Var, 14) if v >= 4 => EraseLine,
            (Var, 15) if v >= 4 => SetCursor,
            (Var, 16) if v >= 4 => GetCursor,
            (Var, 17) if v >= 4 => SetTextStyle,
            (Var, 18) if v >= 4 => BufferMode,
            (Var, 19) => OutputStream,
            (Var, 20) => InputStream,
            (Var, 21) => SoundEffect,
            (Var, 22) if v >= 4 => ReadChar,
            (Var, 23) if v >= 4 => ScanTable,
            (Var, 24) if v >= 5 => Not,
            (Var, 25) if v >= 5 => CallVn,
            (Var, 26) if v >= 5 => CallVn2,
            (Var, 27) if v >= 5 => Tokenise,
            (Var, 28) if v >= 5 => EncodeText,
            (Var, 29) if v >= 5 => CopyTable,
            (Var, 30) if v >= 5 => PrintTable,
            (Var, 31) if v >= 5 => CheckArgCount,

            (Ext, 0) => Save,
            (Ext, 1) => Restore,
            (Ext, 2) => LogShift,
            (Ext, 3) => ArtShift,
            (Ext, 4) => SetFont,
            (Ext, 5) if v == 6 => DrawPicture,
            (Ext, 6) if v == 6 => PictureData,
            (Ext, 7) if v == 6 => ErasePicture,
            (Ext, 8) if v == 6 => SetMargins,
            (Ext, 9) => SaveUndo,
            (Ext, 10) => RestoreUndo,
            (Ext, 11) => PrintUnicode,
            (Ext, 12) => CheckUnicode,
            (Ext, 13) => SetTrueColour,
            (Ext, 16) if v == 6 => MoveWindow,
            (Ext, 17) if v == 6 => WindowSize,
            (Ext, 18) if v == 6 => WindowStyle,
            (Ext, 19) if v == 6 => GetWindProp,
            (Ext, 20) if v == 6 => ScrollWindow,
            (Ext, 21) if v == 6 => PopStack,
            (Ext, 22) if v == 6 => ReadMouse,
            (Ext, 23) if v == 6 => MouseWindow,
            (Ext, 24) if v == 6 => PushStack,
            (Ext, 25) if v == 6 => PutWindProp,
            (Ext, 26) if v == 6 => PrintForm,
            (Ext, 27) if v == 6 => MakeMenu,
            (Ext, 28) if v == 6 => PictureTable,
            (Ext, 29) if v == 6 => BufferScreen,
            _ => return None,
        })
    }

    /// Whether the instruction is followed by a store variable byte.
    pub fn stores(self, version: u8) -> bool {
        use Opcode::*;
        match self {
            Or | And | Loadw | Loadb | GetProp | GetPropAddr | GetNextProp | Add | Sub | Mul
            | Div | Mod | Call2s | GetSibling | GetChild | GetParent | GetPropLen | Call1s
            | Load | Not | Catch | CallVs | Random | CallVs2 | ReadChar | ScanTable
            | LogShift | ArtShift | SetFont | SaveUndo | RestoreUndo | CheckUnicode
            | GetWindProp | BufferScreen => true,
            Save | Restore => version >= 4,
            Read => version >= 5,
            Pull => version == 6,
            _ => false,
        }
    }

    /// Whether the instruction is followed by branch data.
    pub fn branches(self, version: u8) -> bool {
        use Opcode::*;
        match self {
            Je | Jl | Jg | DecChk | IncChk | Jin | Test | TestAttr | Jz | GetSibling
            | GetChild | Verify | Piracy | ScanTable | CheckArgCount | PictureData
            | PushStack | MakeMenu => true,
            Save | Restore => version <= 3,
            _ => false,
        }
    }

    /// Whether a Z-string follows the instruction.
    pub fn has_text(self) -> bool {
        matches!(self, Opcode::Print | Opcode::PrintRet)
    }

    pub fn name(self) -> &'static str {
        use Opcode::*;
        match self {
            Je => "je",
            Jl => "jl",
            Jg => "jg",
            DecChk => "dec_chk",
            IncChk => "inc_chk",
            Jin => "jin",
            Test => "test",
            Or => "or",
            And => "and",
            TestAttr => "test_attr",
            SetAttr => "set_attr",
            ClearAttr => "clear_attr",
            Store => "store",
            InsertObj => "insert_obj",
            Loadw => "loadw",
            Loadb => "loadb",
            GetProp => "get_prop",
            GetPropAddr => "get_prop_addr",
            GetNextProp => "get_next_prop",
            Add => "add",
            Sub => "sub",
            Mul => "mul",
            Div => "div",
            Mod => "mod",
            Call2s => "call_2s",
            Call2n => "call_2n",
            SetColour => "set_colour",
            Throw => "throw",
            Jz => "jz",
            GetSibling => "get_sibling",
            GetChild => "get_child",
            GetParent => "get_parent",
            GetPropLen => "get_prop_len",
            Inc => "inc",
            Dec => "dec",
            PrintAddr => "print_addr",
            Call1s => "call_1s",
            RemoveObj => "remove_obj",
            PrintObj => "print_obj",
            Ret => "ret",
            Jump => "jump",
            PrintPaddr => "print_paddr",
            Load => "load",
            Not => "not",
            Call1n => "call_1n",
            Rtrue => "rtrue",
            Rfalse => "rfalse",
            Print => "print",
            PrintRet => "print_ret",
            Nop => "nop",
            Save => "save",
            Restore => "restore",
            Restart => "restart",
            RetPopped => "ret_popped",
            Pop => "pop",
            Catch => "catch",
            Quit => "quit",
            NewLine => "new_line",
            ShowStatus => "show_status",
            Verify => "verify",
            Piracy => "piracy",
            CallVs => "call_vs",
            Storew => "storew",
            Storeb => "storeb",
            PutProp => "put_prop",
            Read => "read",
            PrintChar => "print_char",
            PrintNum => "print_num",
            Random => "random",
            Push => "push",
            Pull => "pull",
            SplitWindow => "split_window",
            SetWindow => "set_window",
            CallVs2 => "call_vs2",
            EraseWindow => "erase_window",
            EraseLine => "erase_line",
            SetCursor => "set_cursor",
            GetCursor => "get_cursor",
            SetTextStyle => "set_text_style",
            BufferMode => "buffer_mode",
            OutputStream => "output_stream",
            InputStream => "input_stream",
            SoundEffect => "sound_effect",
            ReadChar => "read_char",
            ScanTable => "scan_table",
            CallVn => "call_vn",
            CallVn2 => "call_vn2",
            Tokenise => "tokenise",
            EncodeText => "encode_text",
            CopyTable => "copy_table",
            PrintTable => "print_table",
            CheckArgCount => "check_arg_count",
            LogShift => "log_shift",
            ArtShift => "art_shift",
            SetFont => "set_font",
            DrawPicture => "draw_picture",
            PictureData => "picture_data",
            ErasePicture => "erase_picture",
            SetMargins => "set_margins",
            SaveUndo => "save_undo",
            RestoreUndo => "restore_undo",
            PrintUnicode => "print_unicode",
            CheckUnicode => "check_unicode",
            SetTrueColour => "set_true_colour",
            MoveWindow => "move_window",
            WindowSize => "window_size",
            WindowStyle => "window_style",
            GetWindProp => "get_wind_prop",
            ScrollWindow => "scroll_window",
            PopStack => "pop_stack",
            ReadMouse => "read_mouse",
            MouseWindow => "mouse_window",
            PushStack => "push_stack",
            PutWindProp => "put_wind_prop",
            PrintForm => "print_form",
            MakeMenu => "make_menu",
            PictureTable => "picture_table",
            BufferScreen => "buffer_screen",
        }
    }
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.name().to_uppercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_dependent() {
        use OperandCount::*;
        assert_eq!(Opcode::decode(Op1, 15, 3), Some(Opcode::Not));
        assert_eq!(Opcode::decode(Op1, 15, 5), Some(Opcode::Call1n));
        assert_eq!(Opcode::decode(Op0, 9, 4), Some(Opcode::Pop));
        assert_eq!(Opcode::decode(Op0, 9, 8), Some(Opcode::Catch));
        assert_eq!(Opcode::decode(Op0, 5, 5), None);
        assert_eq!(Opcode::decode(Op2, 25, 3), None);
        assert_eq!(Opcode::decode(Ext, 5, 5), None);
        assert_eq!(Opcode::decode(Ext, 5, 6), Some(Opcode::DrawPicture));
    }

    #[test]
    fn test_store_and_branch() {
        assert!(Opcode::Save.branches(3));
        assert!(!Opcode::Save.stores(3));
        assert!(Opcode::Save.stores(4));
        assert!(Opcode::Read.stores(5));
        assert!(!Opcode::Read.stores(4));
        assert!(Opcode::GetChild.stores(5) && Opcode::GetChild.branches(5));
        assert_eq!(Opcode::PrintPaddr.to_string(), "PRINT_PADDR");
    }
}
