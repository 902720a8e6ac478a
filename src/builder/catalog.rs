use rust_decimal::Decimal;

/// Quick-pick amounts (ETH) offered in manual mode.
pub const PRESET_AMOUNTS: [&str; 8] = ["1", "2", "3", "4", "5", "6", "7", "8"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    pub name: String,
    /// Unit price in ETH
    pub price: Decimal,
}

impl Product {
    /// `tenths` of an ETH.
    fn tenths(name: &str, tenths: i64) -> Self {
        Self {
            name: name.to_string(),
            price: Decimal::new(tenths, 1),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    products: Vec<Product>,
}

impl Catalog {
    pub fn new(products: Vec<Product>) -> Self {
        Self { products }
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn find(&self, name: &str) -> Option<&Product> {
        self.products.iter().find(|p| p.name == name)
    }
}

impl Default for Catalog {
    /// The grocery catalog the terminal ships with.
    fn default() -> Self {
        Self::new(vec![
            Product::tenths("Cerveza", 10),
            Product::tenths("Refresco", 5),
            Product::tenths("Agua", 2),
            Product::tenths("Manzana", 3),
            Product::tenths("Banana", 4),
            Product::tenths("Naranja", 6),
            Product::tenths("Pan", 2),
            Product::tenths("Leche", 8),
            Product::tenths("Arroz", 12),
            Product::tenths("Azúcar", 10),
            Product::tenths("Sal", 1),
            Product::tenths("Aceite", 15),
            Product::tenths("Fideos", 9),
            Product::tenths("Café", 13),
            Product::tenths("Té", 10),
            Product::tenths("Galletas", 5),
            Product::tenths("Snacks", 7),
            Product::tenths("Chocolate", 10),
        ])
    }
}
