/// Commented default configuration written by `generate-config`
pub const DEFAULT_CONFIG: &str = r#"{
  // Derive the URL key of existing products from the name column when the
  // row has no url_key. Set to false to keep the persisted URL key instead.
  "updateUrlKeyFromName": true,

  // Separator between category paths in the categories column
  "categoryDelimiter": ",",

  // Number of parallel import workers. Rows of one SKU always stay together.
  "workers": 1,

  "slug": {
    // Maximum number of uniqueness checks for one URL key
    "maxIterations": 64,
    // How often a URL key reservation lost to another worker is retried
    "maxReservationRetries": 5
  },

  // Source column -> target attribute and type (int, float, string, bool)
  "productColumns": {
    "sku": { "target": "sku", "type": "string" },
    "name": { "target": "name", "type": "string" },
    "url_key": { "target": "url_key", "type": "string" },
    "visibility": { "target": "visibility", "type": "int" },
    "status": { "target": "status", "type": "int" },
    "price": { "target": "price", "type": "float" },
    "special_price": { "target": "special_price", "type": "float" },
    "weight": { "target": "weight", "type": "float" },
    "tax_class_id": { "target": "tax_class_id", "type": "int" },
    "description": { "target": "description", "type": "string" },
    "short_description": { "target": "short_description", "type": "string" },
    "meta_title": { "target": "meta_title", "type": "string" },
    "meta_description": { "target": "meta_description", "type": "string" },
    "attribute_set_code": { "target": "attribute_set_code", "type": "string" },
    "product_type": { "target": "product_type", "type": "string" }
  },

  // Inventory columns, written per product, website and stock
  "stockColumns": {
    "qty": { "target": "qty", "type": "float" },
    "out_of_stock_qty": { "target": "min_qty", "type": "float" },
    "use_config_min_qty": { "target": "use_config_min_qty", "type": "int" },
    "is_qty_decimal": { "target": "is_qty_decimal", "type": "int" },
    "allow_backorders": { "target": "backorders", "type": "int" },
    "use_config_backorders": { "target": "use_config_backorders", "type": "int" },
    "min_cart_qty": { "target": "min_sale_qty", "type": "float" },
    "use_config_min_sale_qty": { "target": "use_config_min_sale_qty", "type": "int" },
    "max_cart_qty": { "target": "max_sale_qty", "type": "float" },
    "use_config_max_sale_qty": { "target": "use_config_max_sale_qty", "type": "int" },
    "is_in_stock": { "target": "is_in_stock", "type": "int" },
    "notify_on_stock_below": { "target": "notify_stock_qty", "type": "float" },
    "use_config_notify_stock_qty": { "target": "use_config_notify_stock_qty", "type": "int" },
    "manage_stock": { "target": "manage_stock", "type": "int" },
    "use_config_manage_stock": { "target": "use_config_manage_stock", "type": "int" },
    "use_config_qty_increments": { "target": "use_config_qty_increments", "type": "int" },
    "qty_increments": { "target": "qty_increments", "type": "float" },
    "use_config_enable_qty_inc": { "target": "use_config_enable_qty_inc", "type": "int" },
    "enable_qty_increments": { "target": "enable_qty_increments", "type": "int" },
    "is_decimal_divided": { "target": "is_decimal_divided", "type": "int" }
  },

  // Product columns that may differ per store view
  "storeScopedColumns": [
    "name",
    "url_key",
    "visibility",
    "status",
    "description",
    "short_description",
    "meta_title",
    "meta_description"
  ],

  // Columns whose empty cells clear the persisted value. Other empty cells
  // leave the persisted value untouched.
  "cleanUpEmptyColumns": [],

  // Image column pairs; the role is the path column without "_image"
  "imageTypes": [
    { "path": "base_image", "label": "base_image_label" },
    { "path": "small_image", "label": "small_image_label" },
    { "path": "thumbnail_image", "label": "thumbnail_image_label" },
    { "path": "swatch_image", "label": "swatch_image_label" }
  ],

  // Visibility labels accepted in the visibility column
  "visibilities": {
    "Not Visible Individually": 1,
    "Catalog": 2,
    "Search": 3,
    "Catalog, Search": 4
  }
}
"#;
