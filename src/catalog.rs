//! The static product catalog.
//!
//! Records are compiled in and built once at startup; nothing mutates them afterwards.

use crate::domain::aggregates::{Product, ProductFlags};
use crate::domain::value_objects::{Money, Price, ProductId};
use crate::filter::{self, CategorySection, SpecSelection};
use crate::view::{NavItem, NAV_ITEMS};

/// Products shown in "The Collection" on the home screen.
const FEATURED_COUNT: usize = 4;
const RELATED_COUNT: usize = 4;

#[derive(Clone, Debug)]
pub struct Catalog {
    products: Vec<Product>,
}

impl Catalog {
    pub fn new(products: Vec<Product>) -> Self { Self { products } }

    /// The ZM Computers wholesale line-up.
    pub fn builtin() -> Self {
        let image = |id: &str| format!("https://images.unsplash.com/photo-{id}?auto=format&fit=crop&q=80&w=800");
        Self::new(vec![
            Product::create("1", "Zenith Pro X1", "Laptops", Price::plain(Money::rupees(699_000)))
                .with_image(image("1603302576837-37561b2e2302"))
                .with_specs(["Intel Core i9-13980HX", "64GB DDR5 RAM", "RTX 4090 16GB"])
                .with_flags(ProductFlags { is_new: true, on_sale: false, best_seller: true }),
            Product::create("2", "Matrix G7 Enterprise", "Desktops", Price::discounted(Money::rupees(980_000), Money::rupees(890_000)))
                .with_image(image("1593640408182-31c70c8268f5"))
                .with_specs(["AMD Ryzen 9 7950X", "128GB ECC RAM", "Dual RTX 4080"])
                .with_flags(ProductFlags { is_new: false, on_sale: true, best_seller: false }),
            Product::create("3", "Nano Core Ultra", "Workstations", Price::plain(Money::rupees(360_000)))
                .with_image(image("1541807084-5c52b6b3adef"))
                .with_specs(["Apple M3 Max Chip", "32GB Unified Memory", "1TB NVMe"])
                .with_flags(ProductFlags { is_new: true, on_sale: false, best_seller: true }),
            Product::create("4", "Elysium S-Series 8K", "Monitors", Price::discounted(Money::rupees(240_000), Money::rupees(185_000)))
                .with_image(image("1527443224154-c4a3942d3acf"))
                .with_specs(["32\" 8K OLED Display", "ProMotion 120Hz", "99.9% DCI-P3"])
                .with_flags(ProductFlags { is_new: false, on_sale: true, best_seller: false }),
            Product::create("5", "Vanguard Blade 14", "Laptops", Price::plain(Money::rupees(550_000)))
                .with_image(image("1525547719571-a2d4ac8945e2"))
                .with_specs(["Intel Core i7 13th Gen", "32GB RAM", "RTX 4070 Laptop GPU"])
                .with_flags(ProductFlags { is_new: false, on_sale: false, best_seller: true }),
            Product::create("6", "Titan Server Node V2", "Workstations", Price::discounted(Money::rupees(1_650_000), Money::rupees(1_480_000)))
                .with_image(image("1558494949-ef010cbdcc51"))
                .with_specs(["Dual Xeon Platinum 8480+", "512GB ECC DDR5", "U.2 NVMe RAID"])
                .with_flags(ProductFlags { is_new: false, on_sale: true, best_seller: false }),
            Product::create("7", "Quantum Hub 5", "Accessories", Price::plain(Money::rupees(45_000)))
                .with_image(image("1588508065123-287b28e013da"))
                .with_specs(["Thunderbolt 4 Certified", "10-in-1 Connectivity", "100W Power Delivery"])
                .with_flags(ProductFlags { is_new: true, on_sale: false, best_seller: false }),
            Product::create("8", "Apex Mechanical G-1", "Accessories", Price::plain(Money::rupees(65_000)))
                .with_image(image("1511467687858-23d96c32e4ae"))
                .with_specs(["Opto-Mechanical Switches", "Full Aluminum Body", "Wireless 2.4GHz"])
                .with_flags(ProductFlags { is_new: false, on_sale: false, best_seller: true }),
        ])
    }

    pub fn all(&self) -> &[Product] { &self.products }
    pub fn len(&self) -> usize { self.products.len() }
    pub fn is_empty(&self) -> bool { self.products.is_empty() }

    pub fn find(&self, id: &ProductId) -> Option<&Product> { self.products.iter().find(|p| p.id() == id) }

    pub fn featured(&self) -> &[Product] { &self.products[..FEATURED_COUNT.min(self.products.len())] }

    /// Best sellers and sale items, in catalog order.
    pub fn best_sellers(&self) -> Vec<&Product> {
        self.products.iter().filter(|p| p.is_best_seller() || p.is_on_sale()).collect()
    }

    /// Other products from the same category, at most four.
    pub fn related(&self, product: &Product) -> Vec<&Product> {
        self.products.iter()
            .filter(|p| p.category() == product.category() && p.id() != product.id())
            .take(RELATED_COUNT)
            .collect()
    }

    pub fn filter(&self, selection: &SpecSelection) -> Vec<&Product> { filter::filter_by_specs(&self.products, selection) }

    pub fn all_specs(&self) -> Vec<String> { filter::collect_all_specs(&self.products) }

    pub fn sections(&self, selection: &SpecSelection) -> Vec<CategorySection<'_>> {
        filter::group_by_category(self.filter(selection))
    }

    pub fn nav_items(&self) -> &'static [NavItem] { &NAV_ITEMS }
}

impl Default for Catalog { fn default() -> Self { Self::builtin() } }

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(products: &[&Product]) -> Vec<String> { products.iter().map(|p| p.id().to_string()).collect() }

    #[test]
    fn test_builtin_catalog_has_unique_ids() {
        let catalog = Catalog::builtin();
        assert_eq!(catalog.len(), 8);
        let mut seen: Vec<_> = catalog.all().iter().map(|p| p.id().clone()).collect();
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), catalog.len());
    }

    #[test]
    fn test_featured_is_first_four() {
        let catalog = Catalog::builtin();
        let featured: Vec<_> = catalog.featured().iter().map(|p| p.id().as_str()).collect();
        assert_eq!(featured, ["1", "2", "3", "4"]);
    }

    #[test]
    fn test_best_sellers_include_sale_items() {
        let catalog = Catalog::builtin();
        assert_eq!(ids(&catalog.best_sellers()), ["1", "2", "3", "4", "5", "6", "8"]);
    }

    #[test]
    fn test_related_excludes_self() {
        let catalog = Catalog::builtin();
        let zenith = catalog.find(&ProductId::new("1")).unwrap();
        assert_eq!(ids(&catalog.related(zenith)), ["5"]);
    }

    #[test]
    fn test_find_unknown() {
        assert!(Catalog::builtin().find(&ProductId::new("99")).is_none());
    }
}
