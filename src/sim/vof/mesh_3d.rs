use std::collections::{HashMap, HashSet};

use crate::geom::EPS;
use crate::geom::polyhedron::{
    HEXAHEDRON_FACES as HEX_LOOPS, PRISM_QUAD_FACES as PRISM_QUAD_LOOPS,
    PRISM_TRI_FACES as PRISM_TRI_LOOPS, TETRAHEDRON_FACES as TET_LOOPS,
};
use crate::sim::vof::error::{VofError, VofResult};
use crate::sim::vof::mesh::{BOUNDARY, CellTopology, VofCell, VofFace, VofMesh};
use crate::sim::vof::shape::{CellShape, CutVolume};
use crate::{Point, Polyhedron, Vector};

impl CellTopology {
    /// Global vertex indices used by the cell, in first-appearance order.
    pub fn vertex_ids(&self) -> Vec<usize> {
        match self {
            Self::Tetrahedron(ids) => ids.to_vec(),
            Self::Prism(ids) => ids.to_vec(),
            Self::Hexahedron(ids) => ids.to_vec(),
            Self::Polyhedron(faces) => {
                let mut ids: Vec<usize> = Vec::new();
                for &v in faces.iter().flatten() {
                    if !ids.contains(&v) {
                        ids.push(v);
                    }
                }
                ids
            }
        }
    }

    /// Face loops in global vertex indices (winding not yet normalized).
    pub fn face_loops(&self) -> Vec<Vec<usize>> {
        let local_to_global = |ids: &[usize], loops: &[&[usize]]| -> Vec<Vec<usize>> {
            loops
                .iter()
                .map(|l| l.iter().map(|&i| ids[i]).collect())
                .collect()
        };
        match self {
            Self::Tetrahedron(ids) => {
                let loops: Vec<&[usize]> = TET_LOOPS.iter().map(|l| l.as_slice()).collect();
                local_to_global(ids, &loops)
            }
            Self::Prism(ids) => {
                let loops: Vec<&[usize]> = PRISM_TRI_LOOPS
                    .iter()
                    .map(|l| l.as_slice())
                    .chain(PRISM_QUAD_LOOPS.iter().map(|l| l.as_slice()))
                    .collect();
                local_to_global(ids, &loops)
            }
            Self::Hexahedron(ids) => {
                let loops: Vec<&[usize]> = HEX_LOOPS.iter().map(|l| l.as_slice()).collect();
                local_to_global(ids, &loops)
            }
            Self::Polyhedron(faces) => faces.clone(),
        }
    }

    fn shape(&self, vertices: &[Point], cell_idx: usize) -> VofResult<CellShape> {
        let ids = self.vertex_ids();
        if let Some(&bad) = ids.iter().find(|&&v| v >= vertices.len()) {
            return Err(VofError::InvalidMesh(format!(
                "cell {cell_idx} references vertex {bad}, but only {} vertices exist",
                vertices.len()
            )));
        }
        let pts = |ids: &[usize]| -> Vec<Point> { ids.iter().map(|&i| vertices[i]).collect() };
        let shape = match self {
            Self::Tetrahedron(ids) => CellShape::Tetrahedron(ids.map(|i| vertices[i])),
            Self::Prism(ids) => CellShape::Prism(ids.map(|i| vertices[i])),
            Self::Hexahedron(ids) => CellShape::hexahedron(ids.map(|i| vertices[i])),
            Self::Polyhedron(faces) => {
                let local: Vec<Vec<usize>> = faces
                    .iter()
                    .map(|f| {
                        f.iter()
                            .filter_map(|v| ids.iter().position(|x| x == v))
                            .collect()
                    })
                    .collect();
                let poly = Polyhedron::new(pts(&ids), local)
                    .map_err(|e| VofError::InvalidMesh(format!("cell {cell_idx}: {e}")))?;
                CellShape::polyhedron(poly)
            }
        };
        Ok(shape)
    }
}

#[derive(Debug, Clone)]
struct PendingFace {
    cell_idx: usize,
    vertices: Vec<Point>,
    area: Vector,
}

impl VofMesh {
    /// Build a finite-volume mesh from cells sharing a vertex list.
    ///
    /// - One [`VofCell`] is created per topology entry, in input order.
    /// - Face loops with the same vertex set become one interior [`VofFace`];
    ///   the first cell to list it is the owner.
    /// - Unmatched face loops become boundary faces, appended in sorted
    ///   vertex-key order.
    pub fn from_cells(vertices: Vec<Point>, topology: &[CellTopology]) -> VofResult<Self> {
        let scale = mesh_scale(&vertices);
        let mut cells = Vec::with_capacity(topology.len());

        for (i, top) in topology.iter().enumerate() {
            let shape = top.shape(&vertices, i)?;
            let volume = shape.volume();
            if !(volume > EPS * scale.powi(3)) {
                return Err(VofError::DegenerateGeometry { cell: i, volume });
            }
            let centroid = shape.centroid();
            cells.push(VofCell {
                shape,
                volume,
                centroid,
                faces: Vec::new(),
            });
        }

        let mut faces: Vec<VofFace> = Vec::new();
        let mut pending: HashMap<Vec<usize>, PendingFace> = HashMap::new();
        let mut paired: HashSet<Vec<usize>> = HashSet::new();

        for (cell_idx, top) in topology.iter().enumerate() {
            for mut ids in top.face_loops() {
                let key = sorted_face_key(&ids);
                if paired.contains(&key) {
                    return Err(VofError::InvalidMesh(format!(
                        "face {key:?} is shared by more than 2 cells"
                    )));
                }

                let mut pts: Vec<Point> = ids.iter().map(|&v| vertices[v]).collect();
                let mut area = Vector::area_vector(&pts);
                if !(area.length() > EPS * scale.powi(2)) {
                    return Err(VofError::InvalidMesh(format!(
                        "degenerate face {key:?} in cell {cell_idx}"
                    )));
                }
                let outward = Point::average(&pts) - cells[cell_idx].centroid;
                if area.dot(&outward) < 0.0 {
                    ids.reverse();
                    pts.reverse();
                    area = -area;
                }

                if let Some(other) = pending.remove(&key) {
                    if other.cell_idx == cell_idx {
                        return Err(VofError::InvalidMesh(format!(
                            "cell {cell_idx} lists face {key:?} twice"
                        )));
                    }
                    let face_idx = faces.len();
                    faces.push(VofFace {
                        owner: other.cell_idx,
                        neighbour: cell_idx,
                        area: other.area,
                        centroid: Point::average(&other.vertices),
                        vertices: other.vertices,
                    });
                    cells[other.cell_idx].faces.push(face_idx);
                    cells[cell_idx].faces.push(face_idx);
                    paired.insert(key);
                } else {
                    pending.insert(
                        key,
                        PendingFace {
                            cell_idx,
                            vertices: pts,
                            area,
                        },
                    );
                }
            }
        }

        let mut boundary: Vec<(Vec<usize>, PendingFace)> = pending.into_iter().collect();
        boundary.sort_unstable_by(|a, b| a.0.cmp(&b.0));
        for (_, entry) in boundary {
            let face_idx = faces.len();
            faces.push(VofFace {
                owner: entry.cell_idx,
                neighbour: BOUNDARY,
                area: entry.area,
                centroid: Point::average(&entry.vertices),
                vertices: entry.vertices,
            });
            cells[entry.cell_idx].faces.push(face_idx);
        }

        for cell in cells.iter_mut() {
            cell.faces.sort_unstable();
        }

        Ok(Self {
            vertices,
            cells,
            faces,
        })
    }
}

fn sorted_face_key(face: &[usize]) -> Vec<usize> {
    let mut key = face.to_vec();
    key.sort_unstable();
    key
}

fn mesh_scale(vertices: &[Point]) -> f64 {
    let (lo, hi) = vertices.iter().fold(
        (
            Point::new(f64::INFINITY, f64::INFINITY, f64::INFINITY),
            Point::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
        ),
        |(lo, hi), p| {
            (
                Point::new(lo.x.min(p.x), lo.y.min(p.y), lo.z.min(p.z)),
                Point::new(hi.x.max(p.x), hi.y.max(p.y), hi.z.max(p.z)),
            )
        },
    );
    let d = hi - lo;
    let extent = d.dx.max(d.dy).max(d.dz);
    if extent > 0.0 { extent } else { 1.0 }
}

/// Structured grid of box corners; returns the vertices and an index function.
fn lattice(
    n: [usize; 3],
    lengths: [f64; 3],
    origin: Point,
) -> VofResult<(Vec<Point>, impl Fn(usize, usize, usize) -> usize)> {
    if n.contains(&0) {
        return Err(VofError::InvalidMesh(format!(
            "cell counts must be positive, got {n:?}"
        )));
    }
    if lengths.iter().any(|&l| !(l > 0.0)) {
        return Err(VofError::InvalidMesh(format!(
            "box lengths must be positive, got {lengths:?}"
        )));
    }
    let [nx, ny, nz] = n;
    let h = [
        lengths[0] / nx as f64,
        lengths[1] / ny as f64,
        lengths[2] / nz as f64,
    ];
    let mut vertices = Vec::with_capacity((nx + 1) * (ny + 1) * (nz + 1));
    for k in 0..=nz {
        for j in 0..=ny {
            for i in 0..=nx {
                vertices.push(
                    origin + Vector::new(i as f64 * h[0], j as f64 * h[1], k as f64 * h[2]),
                );
            }
        }
    }
    let id = move |i: usize, j: usize, k: usize| i + (nx + 1) * (j + (ny + 1) * k);
    Ok((vertices, id))
}

/// Iterates the boxes of an `n` grid with `x` varying fastest.
fn boxes(n: [usize; 3]) -> impl Iterator<Item = (usize, usize, usize)> {
    let [nx, ny, nz] = n;
    (0..nz).flat_map(move |k| (0..ny).flat_map(move |j| (0..nx).map(move |i| (i, j, k))))
}

/// Corner indices of box `(i, j, k)` in hexahedron order.
fn box_corners(id: &impl Fn(usize, usize, usize) -> usize, i: usize, j: usize, k: usize) -> [usize; 8] {
    [
        id(i, j, k),
        id(i + 1, j, k),
        id(i + 1, j + 1, k),
        id(i, j + 1, k),
        id(i, j, k + 1),
        id(i + 1, j, k + 1),
        id(i + 1, j + 1, k + 1),
        id(i, j + 1, k + 1),
    ]
}

/// Build a structured hexahedral mesh of `n[0] x n[1] x n[2]` boxes spanning
/// `lengths`, with its minimum corner at `origin`.
///
/// Cell `i + nx * (j + ny * k)` is the box at grid position `(i, j, k)`.
pub fn build_box_mesh(n: [usize; 3], lengths: [f64; 3], origin: Point) -> VofResult<VofMesh> {
    let (vertices, id) = lattice(n, lengths, origin)?;
    let cells: Vec<CellTopology> = boxes(n)
        .map(|(i, j, k)| CellTopology::Hexahedron(box_corners(&id, i, j, k)))
        .collect();
    VofMesh::from_cells(vertices, &cells)
}

/// Like [`build_box_mesh`], with every box split into six tetrahedra sharing
/// the main diagonal (conforming across boxes).
pub fn build_tet_box_mesh(n: [usize; 3], lengths: [f64; 3], origin: Point) -> VofResult<VofMesh> {
    // Corner index in box_corners order for offsets (bx, by, bz)
    const CORNER: [[[usize; 2]; 2]; 2] = [[[0, 4], [3, 7]], [[1, 5], [2, 6]]];
    const AXIS_ORDERS: [[usize; 3]; 6] = [
        [0, 1, 2],
        [0, 2, 1],
        [1, 0, 2],
        [1, 2, 0],
        [2, 0, 1],
        [2, 1, 0],
    ];

    let (vertices, id) = lattice(n, lengths, origin)?;
    let mut cells = Vec::with_capacity(6 * n.iter().product::<usize>());
    for (i, j, k) in boxes(n) {
        let c = box_corners(&id, i, j, k);
        for order in AXIS_ORDERS {
            let mut bits = [0usize; 3];
            let mut tet = [c[0]; 4];
            for (step, axis) in order.iter().enumerate() {
                bits[*axis] = 1;
                tet[step + 1] = c[CORNER[bits[0]][bits[1]][bits[2]]];
            }
            cells.push(CellTopology::Tetrahedron(tet));
        }
    }
    VofMesh::from_cells(vertices, &cells)
}

/// Like [`build_box_mesh`], with every box split into two triangular prisms
/// along its `(0, 2)` vertical diagonal plane.
pub fn build_prism_box_mesh(
    n: [usize; 3],
    lengths: [f64; 3],
    origin: Point,
) -> VofResult<VofMesh> {
    let (vertices, id) = lattice(n, lengths, origin)?;
    let mut cells = Vec::with_capacity(2 * n.iter().product::<usize>());
    for (i, j, k) in boxes(n) {
        let c = box_corners(&id, i, j, k);
        cells.push(CellTopology::Prism([c[0], c[1], c[2], c[4], c[5], c[6]]));
        cells.push(CellTopology::Prism([c[0], c[2], c[3], c[4], c[6], c[7]]));
    }
    VofMesh::from_cells(vertices, &cells)
}
