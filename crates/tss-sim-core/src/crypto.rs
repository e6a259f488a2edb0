//! secp256k1 helpers shared by the protocol engines and the verifier

use crate::{Error, Result};
use k256::{
    AffinePoint, FieldBytes, ProjectivePoint, Scalar,
    elliptic_curve::{
        Field, PrimeField,
        bigint::U256,
        ops::Reduce,
        sec1::{FromEncodedPoint, ToEncodedPoint},
    },
};
use rand::rngs::OsRng;

/// Sample a uniformly random non-zero scalar
pub fn random_nonzero_scalar() -> Scalar {
    let mut rng = OsRng;
    loop {
        let candidate = Scalar::random(&mut rng);
        if !bool::from(candidate.is_zero()) {
            return candidate;
        }
    }
}

/// Compressed SEC1 encoding of a point, hex encoded
pub fn point_to_hex(point: &ProjectivePoint) -> String {
    hex::encode(point.to_affine().to_encoded_point(true).as_bytes())
}

/// Decode a hex SEC1 point
pub fn point_from_hex(encoded: &str) -> Result<ProjectivePoint> {
    let bytes = hex::decode(encoded)?;
    let point =
        k256::EncodedPoint::from_bytes(&bytes).map_err(|e| Error::Crypto(e.to_string()))?;
    let affine_opt = AffinePoint::from_encoded_point(&point);
    let affine: AffinePoint = Option::<AffinePoint>::from(affine_opt)
        .ok_or_else(|| Error::Crypto("Invalid curve point".into()))?;
    Ok(ProjectivePoint::from(affine))
}

/// Hex encoding of a scalar (32 bytes, big-endian)
pub fn scalar_to_hex(scalar: &Scalar) -> String {
    hex::encode(scalar.to_bytes())
}

/// Decode a canonical hex scalar
pub fn scalar_from_hex(encoded: &str) -> Result<Scalar> {
    let bytes: [u8; 32] = hex::decode(encoded)?
        .try_into()
        .map_err(|_| Error::Deserialization("Invalid scalar length".into()))?;
    Option::<Scalar>::from(Scalar::from_repr(FieldBytes::from(bytes)))
        .ok_or_else(|| Error::Deserialization("Scalar out of range".into()))
}

/// The x-coordinate of a point reduced modulo the group order
///
/// Returns `None` for the identity.
pub fn x_coordinate(point: &ProjectivePoint) -> Option<Scalar> {
    if *point == ProjectivePoint::IDENTITY {
        return None;
    }
    let encoded = point.to_affine().to_encoded_point(false);
    let x: [u8; 32] = encoded.as_bytes()[1..33].try_into().ok()?;
    Some(<Scalar as Reduce<U256>>::reduce_bytes(&x.into()))
}

/// Whether the y-coordinate of a point is odd
pub fn y_is_odd(point: &ProjectivePoint) -> bool {
    point.to_affine().to_encoded_point(true).as_bytes()[0] == 0x03
}

/// Evaluate polynomial at a point using Horner's method
pub fn evaluate_polynomial(coefficients: &[Scalar], x: u64) -> Scalar {
    let x_scalar = Scalar::from(x);
    coefficients
        .iter()
        .rev()
        .fold(Scalar::ZERO, |acc, coef| acc * x_scalar + coef)
}

/// Evaluate committed coefficients `C_j = a_j·G` at `x`, giving `f(x)·G`
pub fn evaluate_commitments(commitments: &[ProjectivePoint], x: u64) -> ProjectivePoint {
    let x_scalar = Scalar::from(x);
    commitments
        .iter()
        .rev()
        .fold(ProjectivePoint::IDENTITY, |acc, c| acc * x_scalar + c)
}

/// Lagrange coefficient at zero for `index` over the evaluation points `indices`
pub fn lagrange_coefficient(index: usize, indices: &[usize]) -> Result<Scalar> {
    let i = Scalar::from(index as u64);
    let mut numerator = Scalar::ONE;
    let mut denominator = Scalar::ONE;

    for &other in indices {
        if other == index {
            continue;
        }
        let j = Scalar::from(other as u64);
        numerator *= j;
        denominator *= j - i;
    }

    let inverse = Option::<Scalar>::from(denominator.invert())
        .ok_or_else(|| Error::Crypto("Duplicate evaluation points".into()))?;
    Ok(numerator * inverse)
}

/// Standard ECDSA verification over secp256k1
///
/// `r` and `s` are big-endian encodings; out-of-range or zero values are
/// rejected rather than reduced.
pub fn verify_ecdsa(public_key: &ProjectivePoint, digest: &Scalar, r: &[u8; 32], s: &[u8; 32]) -> bool {
    let r = match Option::<Scalar>::from(Scalar::from_repr(FieldBytes::from(*r))) {
        Some(r) if !bool::from(r.is_zero()) => r,
        _ => return false,
    };
    let s_inv = match Option::<Scalar>::from(Scalar::from_repr(FieldBytes::from(*s)))
        .and_then(|s| Option::<Scalar>::from(s.invert()))
    {
        Some(inv) => inv,
        None => return false,
    };

    let u1 = *digest * s_inv;
    let u2 = r * s_inv;
    let point = ProjectivePoint::GENERATOR * u1 + *public_key * u2;

    match x_coordinate(&point) {
        Some(x) => x == r,
        None => false,
    }
}
