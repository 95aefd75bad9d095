//! Builder for Type 2 charstring programs.

/// Charstring operator encodings.
///
/// Two byte operators are prefixed with the escape byte 12.
pub mod op {
    pub const HSTEM: &[u8] = &[1];
    pub const VSTEM: &[u8] = &[3];
    pub const VMOVETO: &[u8] = &[4];
    pub const RLINETO: &[u8] = &[5];
    pub const HLINETO: &[u8] = &[6];
    pub const VLINETO: &[u8] = &[7];
    pub const RRCURVETO: &[u8] = &[8];
    pub const CALLSUBR: &[u8] = &[10];
    pub const RETURN: &[u8] = &[11];
    pub const ENDCHAR: &[u8] = &[14];
    pub const HSTEMHM: &[u8] = &[18];
    pub const HINTMASK: &[u8] = &[19];
    pub const CNTRMASK: &[u8] = &[20];
    pub const RMOVETO: &[u8] = &[21];
    pub const HMOVETO: &[u8] = &[22];
    pub const VSTEMHM: &[u8] = &[23];
    pub const RCURVELINE: &[u8] = &[24];
    pub const RLINECURVE: &[u8] = &[25];
    pub const VVCURVETO: &[u8] = &[26];
    pub const HHCURVETO: &[u8] = &[27];
    pub const CALLGSUBR: &[u8] = &[29];
    pub const VHCURVETO: &[u8] = &[30];
    pub const HVCURVETO: &[u8] = &[31];
    pub const DOTSECTION: &[u8] = &[12, 0];
    pub const AND: &[u8] = &[12, 3];
    pub const OR: &[u8] = &[12, 4];
    pub const NOT: &[u8] = &[12, 5];
    pub const SEAC: &[u8] = &[12, 6];
    pub const ABS: &[u8] = &[12, 9];
    pub const ADD: &[u8] = &[12, 10];
    pub const SUB: &[u8] = &[12, 11];
    pub const DIV: &[u8] = &[12, 12];
    pub const NEG: &[u8] = &[12, 14];
    pub const EQ: &[u8] = &[12, 15];
    pub const DROP: &[u8] = &[12, 18];
    pub const PUT: &[u8] = &[12, 20];
    pub const GET: &[u8] = &[12, 21];
    pub const IFELSE: &[u8] = &[12, 22];
    pub const RANDOM: &[u8] = &[12, 23];
    pub const MUL: &[u8] = &[12, 24];
    pub const SQRT: &[u8] = &[12, 26];
    pub const DUP: &[u8] = &[12, 27];
    pub const EXCH: &[u8] = &[12, 28];
    pub const INDEX: &[u8] = &[12, 29];
    pub const ROLL: &[u8] = &[12, 30];
    pub const HFLEX: &[u8] = &[12, 34];
    pub const FLEX: &[u8] = &[12, 35];
    pub const HFLEX1: &[u8] = &[12, 36];
    pub const FLEX1: &[u8] = &[12, 37];
}

/// Incrementally encodes a charstring.
///
/// Integers are written with the shortest available encoding.
#[derive(Clone, Debug, Default)]
pub struct CharstringBuilder(Vec<u8>);

impl CharstringBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes an integer operand.
    pub fn int(mut self, value: i32) -> Self {
        encode_int(value, &mut self.0);
        self
    }

    /// Pushes a sequence of integer operands.
    pub fn ints(self, values: &[i32]) -> Self {
        values.iter().fold(self, |cs, value| cs.int(*value))
    }

    /// Pushes a 16.16 fixed point operand.
    pub fn fixed(mut self, value: f64) -> Self {
        self.0.push(255);
        self.0
            .extend_from_slice(&((value * 65536.0).round() as i32).to_be_bytes());
        self
    }

    /// Appends an operator.
    pub fn op(mut self, op: &[u8]) -> Self {
        self.0.extend_from_slice(op);
        self
    }

    /// Appends raw bytes, such as hint mask data.
    pub fn bytes(mut self, bytes: &[u8]) -> Self {
        self.0.extend_from_slice(bytes);
        self
    }

    pub fn build(self) -> Vec<u8> {
        self.0
    }
}

fn encode_int(value: i32, out: &mut Vec<u8>) {
    match value {
        -107..=107 => out.push((value + 139) as u8),
        108..=1131 => {
            let v = value - 108;
            out.push((v / 256 + 247) as u8);
            out.push((v % 256) as u8);
        }
        -1131..=-108 => {
            let v = -value - 108;
            out.push((v / 256 + 251) as u8);
            out.push((v % 256) as u8);
        }
        -32768..=32767 => {
            out.push(28);
            out.extend_from_slice(&(value as i16).to_be_bytes());
        }
        _ => panic!("integer {value} cannot be encoded in a charstring"),
    }
}
