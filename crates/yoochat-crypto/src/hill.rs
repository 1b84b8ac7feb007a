use crate::{CipherError, MessageCipher};

/// Alphabet size: tab, newline and the 95 printable ASCII characters.
/// 97 is prime, so every key with a non-zero determinant is invertible.
pub const MODULUS: u32 = 97;

/// Largest supported block size. Padding symbols are alphabet indices
/// `1..=n`, which must stay inside the alphabet.
const MAX_BLOCK: usize = 16;

/// Hill cipher keyed by an n×n matrix over Z/97.
///
/// Characters outside the alphabet pass through unchanged at their original
/// position; alphabet characters are enciphered in blocks of `n`. Between 1
/// and `n` padding symbols are always appended, each carrying the pad length
/// as its alphabet index.
#[derive(Debug, Clone)]
pub struct HillCipher {
    n: usize,
    key: Vec<Vec<u32>>,
    inverse: Vec<Vec<u32>>,
}

impl HillCipher {
    /// Parse a key of n² alphabet characters (n >= 2), read row-major.
    pub fn from_key(key: &str) -> Result<Self, CipherError> {
        let values: Vec<u32> = key
            .chars()
            .map(|c| {
                index_of(c).ok_or_else(|| {
                    CipherError::InvalidKey(format!("character {c:?} is outside the cipher alphabet"))
                })
            })
            .collect::<Result<_, _>>()?;

        let n = (values.len() as f64).sqrt().round() as usize;
        if n < 2 || n * n != values.len() {
            return Err(CipherError::InvalidKey(format!(
                "key length {} is not a square of at least 4",
                values.len()
            )));
        }
        if n > MAX_BLOCK {
            return Err(CipherError::InvalidKey(format!(
                "block size {n} exceeds {MAX_BLOCK}"
            )));
        }

        let key: Vec<Vec<u32>> = values.chunks(n).map(|row| row.to_vec()).collect();
        let inverse = invert(&key).ok_or(CipherError::NonInvertibleKey(MODULUS))?;

        Ok(Self { n, key, inverse })
    }

    pub fn block_size(&self) -> usize {
        self.n
    }

    fn apply(&self, matrix: &[Vec<u32>], symbols: &mut [u32]) {
        let mut out = vec![0u32; self.n];
        for block in symbols.chunks_mut(self.n) {
            for (i, row) in matrix.iter().enumerate() {
                out[i] = row
                    .iter()
                    .zip(block.iter())
                    .map(|(k, v)| k * v)
                    .sum::<u32>()
                    % MODULUS;
            }
            block.copy_from_slice(&out);
        }
    }
}

impl MessageCipher for HillCipher {
    fn encrypt(&self, plaintext: &str) -> Result<String, CipherError> {
        let mut symbols: Vec<u32> = plaintext.chars().filter_map(index_of).collect();

        let pad = self.n - symbols.len() % self.n;
        symbols.extend(std::iter::repeat_n(pad as u32, pad));

        self.apply(&self.key, &mut symbols);

        let mut enciphered = symbols.into_iter().map(symbol);
        let mut out = String::with_capacity(plaintext.len() + pad);
        for c in plaintext.chars() {
            match index_of(c) {
                Some(_) => out.extend(enciphered.next()),
                None => out.push(c),
            }
        }
        out.extend(enciphered);

        Ok(out)
    }

    fn decrypt(&self, stored: &str) -> Result<String, CipherError> {
        let mut symbols: Vec<u32> = stored.chars().filter_map(index_of).collect();

        if symbols.is_empty() || symbols.len() % self.n != 0 {
            return Err(CipherError::MalformedCiphertext(format!(
                "{} cipher symbols is not a whole number of {}-blocks",
                symbols.len(),
                self.n
            )));
        }

        self.apply(&self.inverse, &mut symbols);

        let pad = symbols[symbols.len() - 1] as usize;
        if pad == 0 || pad > self.n || symbols[symbols.len() - pad..].iter().any(|&s| s as usize != pad) {
            return Err(CipherError::MalformedCiphertext("bad padding".into()));
        }

        let keep = symbols.len() - pad;
        let mut deciphered = symbols.into_iter().take(keep).map(symbol);
        let mut out = String::with_capacity(stored.len());
        for c in stored.chars() {
            match index_of(c) {
                Some(_) => out.extend(deciphered.next()),
                None => out.push(c),
            }
        }

        Ok(out)
    }
}

fn index_of(c: char) -> Option<u32> {
    match c {
        '\t' => Some(0),
        '\n' => Some(1),
        ' '..='~' => Some(c as u32 - ' ' as u32 + 2),
        _ => None,
    }
}

fn symbol(index: u32) -> char {
    match index {
        0 => '\t',
        1 => '\n',
        i => char::from_u32(i - 2 + ' ' as u32).unwrap_or('?'),
    }
}

fn pow_mod(mut base: u32, mut exp: u32) -> u32 {
    let mut acc = 1u32;
    base %= MODULUS;
    while exp > 0 {
        if exp & 1 == 1 {
            acc = acc * base % MODULUS;
        }
        base = base * base % MODULUS;
        exp >>= 1;
    }
    acc
}

/// Gauss-Jordan inversion over Z/97. `None` when the matrix is singular.
fn invert(matrix: &[Vec<u32>]) -> Option<Vec<Vec<u32>>> {
    let n = matrix.len();
    let mut aug: Vec<Vec<u32>> = matrix
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let mut r = row.iter().map(|v| v % MODULUS).collect::<Vec<_>>();
            r.extend((0..n).map(|j| u32::from(i == j)));
            r
        })
        .collect();

    for col in 0..n {
        let pivot = (col..n).find(|&r| aug[r][col] != 0)?;
        aug.swap(col, pivot);

        // Fermat: a^(p-2) is the inverse of a mod p
        let inv = pow_mod(aug[col][col], MODULUS - 2);
        for v in aug[col].iter_mut() {
            *v = *v * inv % MODULUS;
        }

        for r in 0..n {
            if r == col || aug[r][col] == 0 {
                continue;
            }
            let factor = aug[r][col];
            for c in 0..2 * n {
                let sub = factor * aug[col][c] % MODULUS;
                aug[r][c] = (aug[r][c] + MODULUS - sub) % MODULUS;
            }
        }
    }

    Some(aug.into_iter().map(|row| row[n..].to_vec()).collect())
}
